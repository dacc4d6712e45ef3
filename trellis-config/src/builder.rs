// Layered construction of a ConfigManager

use crate::{ConfigManager, FileFormat, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

enum Source {
    Defaults(Value),
    File { path: PathBuf, format: Option<FileFormat>, required: bool },
    Dotenv(Option<PathBuf>),
    Env,
}

/// Builds a [`ConfigManager`] from sources applied in the order added.
///
/// ```ignore
/// let config = ConfigManager::builder()
///     .prefix("APP")
///     .defaults(json!({"server": {"port": 8080}}))
///     .file("config/app.toml")
///     .optional_file("config/local.toml")
///     .env()
///     .build()?;
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    prefix: Option<String>,
    sources: Vec<Source>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable prefix used by [`env`](Self::env) and
    /// [`dotenv`](Self::dotenv).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn defaults<T: Serialize>(mut self, defaults: T) -> Self {
        // Unserializable defaults are skipped rather than failing the build.
        if let Ok(value) = serde_json::to_value(defaults) {
            self.sources.push(Source::Defaults(value));
        }
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File {
            path: path.into(),
            format: None,
            required: true,
        });
        self
    }

    pub fn file_as(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.sources.push(Source::File {
            path: path.into(),
            format: Some(format),
            required: true,
        });
        self
    }

    /// A file that is skipped when it does not exist.
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File {
            path: path.into(),
            format: None,
            required: false,
        });
        self
    }

    pub fn dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.sources.push(Source::Dotenv(path));
        self
    }

    pub fn env(mut self) -> Self {
        self.sources.push(Source::Env);
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for source in self.sources {
            match source {
                Source::Defaults(value) => manager.merge_value(value),
                Source::File {
                    path,
                    format,
                    required,
                } => {
                    if !required && !path.exists() {
                        tracing::debug!(path = %path.display(), "Optional configuration file missing");
                        continue;
                    }
                    match format {
                        Some(format) => manager.load_file_as(&path, format)?,
                        None => manager.load_file(&path)?,
                    }
                }
                Source::Dotenv(path) => manager.load_dotenv(path.as_deref())?,
                Source::Env => manager.load_env(),
            }
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_then_optional_missing_file() {
        let config = ConfigBuilder::new()
            .defaults(json!({"server": {"port": 8080}}))
            .optional_file("does/not/exist.toml")
            .build()
            .unwrap();
        assert_eq!(config.get_int("server.port").unwrap(), 8080);
    }

    #[test]
    fn test_required_missing_file_fails() {
        let result = ConfigBuilder::new().file("does/not/exist.toml").build();
        assert!(result.is_err());
    }
}
