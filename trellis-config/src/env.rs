// Environment variable loading

use crate::path;
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::env;

/// Maps environment variables onto configuration paths.
///
/// With prefix `APP`, `APP_DATABASE__HOST=db` becomes `database.host = "db"`:
/// the prefix and its separator are stripped, `__` separates nesting
/// levels and keys are lower-cased. Values are parsed as booleans and
/// numbers where possible.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Configuration path for a variable name, or `None` if the variable
    /// does not carry the prefix.
    pub fn path_for(&self, name: &str) -> Option<String> {
        let rest = match &self.prefix {
            Some(prefix) => {
                let rest = name.strip_prefix(prefix.as_str())?;
                let trimmed = rest.trim_start_matches('_');
                if trimmed.len() == rest.len() || trimmed.is_empty() {
                    return None;
                }
                trimmed
            }
            None => name,
        };
        let segments: Vec<String> = rest
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();
        (!segments.is_empty()).then(|| segments.join("."))
    }

    /// Build a configuration tree from `(name, value)` pairs.
    pub fn collect<I, K, V>(&self, vars: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = Value::Object(Map::new());
        for (name, value) in vars {
            if let Some(key) = self.path_for(name.as_ref()) {
                path::insert(&mut root, &key, path::scalar(value.as_ref()));
            }
        }
        root
    }

    /// Build a configuration tree from the process environment.
    pub fn load(&self) -> Value {
        self.collect(env::vars())
    }

    /// Read one variable; `key` is upper-cased and prefixed.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let name = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&name).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_mapping_with_prefix() {
        let loader = EnvLoader::new(Some("APP".to_string()));
        assert_eq!(loader.path_for("APP_DATABASE__HOST").as_deref(), Some("database.host"));
        assert_eq!(loader.path_for("APP__DEBUG").as_deref(), Some("debug"));
        assert_eq!(loader.path_for("APPLE_PIE"), None);
        assert_eq!(loader.path_for("OTHER_DEBUG"), None);
        assert_eq!(loader.path_for("APP_"), None);
    }

    #[test]
    fn test_path_mapping_without_prefix() {
        let loader = EnvLoader::default();
        assert_eq!(loader.path_for("LOG__LEVEL").as_deref(), Some("log.level"));
    }

    #[test]
    fn test_collect_builds_typed_tree() {
        let loader = EnvLoader::new(Some("APP".to_string()));
        let tree = loader.collect([
            ("APP_DATABASE__HOST", "db"),
            ("APP_DATABASE__PORT", "5432"),
            ("APP_DEBUG", "true"),
            ("HOME", "/root"),
        ]);
        assert_eq!(
            tree,
            json!({"database": {"host": "db", "port": 5432}, "debug": true})
        );
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::new(Some("TRELLIS_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
        assert_eq!(loader.load_var_or("MISSING_VAR_67890", "fallback"), "fallback");
    }
}
