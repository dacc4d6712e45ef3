// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by typed configuration sections checked after loading.
///
/// ```ignore
/// impl Validate for DatabaseConfig {
///     fn validate(&self) -> Result<()> {
///         ConfigValidator::new()
///             .not_empty("database.host", &self.host)
///             .port("database.port", self.port)
///             .finish()
///     }
/// }
/// ```
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Collects rule violations and reports them together.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<String>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation when `ok` is false.
    pub fn check(mut self, ok: bool, message: impl FnOnce() -> String) -> Self {
        if !ok {
            self.errors.push(message());
        }
        self
    }

    pub fn not_empty(self, field: &str, value: &str) -> Self {
        self.check(!value.trim().is_empty(), || format!("{} cannot be empty", field))
    }

    pub fn in_range<T: PartialOrd + Display>(self, field: &str, value: T, min: T, max: T) -> Self {
        let ok = value >= min && value <= max;
        self.check(ok, || {
            format!("{} must be between {} and {}, got {}", field, min, max, value)
        })
    }

    pub fn one_of<T: PartialEq + Display>(self, field: &str, value: &T, allowed: &[T]) -> Self {
        self.check(allowed.contains(value), || {
            let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            format!("{} must be one of [{}], got {}", field, allowed.join(", "), value)
        })
    }

    pub fn url(self, field: &str, value: &str) -> Self {
        let ok = value
            .split_once("://")
            .is_some_and(|(scheme, rest)| !scheme.is_empty() && !rest.is_empty());
        self.check(ok, || format!("{} must be a URL, got '{}'", field, value))
    }

    pub fn port(self, field: &str, value: u16) -> Self {
        self.check(value != 0, || format!("{} must be a non-zero port", field))
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// `Ok` if no rule failed, otherwise every violation in one error.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(self.errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passing_rules() {
        let result = ConfigValidator::new()
            .not_empty("app.name", "trellis")
            .in_range("workers", 4, 1, 64)
            .one_of("env", &"prod", &["dev", "prod"])
            .url("database.url", "postgres://localhost/app")
            .port("port", 8080)
            .finish();
        assert!(result.is_ok());
    }

    #[test]
    fn test_violations_are_collected() {
        let validator = ConfigValidator::new()
            .not_empty("app.name", "  ")
            .in_range("workers", 0, 1, 64)
            .url("database.url", "localhost")
            .port("port", 0);
        assert!(!validator.is_valid());
        assert_eq!(validator.errors().len(), 4);

        let message = validator.finish().unwrap_err().to_string();
        assert!(message.contains("workers must be between 1 and 64, got 0"));
        assert!(message.contains("app.name cannot be empty"));
    }
}
