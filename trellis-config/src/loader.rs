// Configuration file loaders

use crate::env::EnvLoader;
use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    /// `KEY=value` lines, nested with `__` like environment variables
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`; a bare `.env` file counts as `Env`.
    pub fn detect(path: &Path) -> Result<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Ok(FileFormat::Env);
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError {
                source_name: path.display().to_string(),
                reason: "no file extension".to_string(),
            })?;
        Self::from_extension(ext).ok_or_else(|| ConfigError::LoadError {
            source_name: path.display().to_string(),
            reason: format!("unsupported format '{}'", ext),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
            FileFormat::Env => "env",
        }
    }
}

/// Reads configuration files into JSON trees.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for the format implied by the file name.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        FileFormat::detect(path.as_ref()).map(Self::new)
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let parsed = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Toml => toml::from_str::<toml::Value>(content)
                .map_err(|e| e.to_string())
                .and_then(|value| serde_json::to_value(value).map_err(|e| e.to_string())),
            FileFormat::Env => parse_env(content),
        };
        parsed.map_err(|reason| ConfigError::ParseError {
            format: self.format.name(),
            reason,
        })
    }
}

fn parse_env(content: &str) -> std::result::Result<Value, String> {
    let pairs = dotenvy::from_read_iter(content.as_bytes())
        .collect::<std::result::Result<Vec<(String, String)>, _>>()
        .map_err(|e| e.to_string())?;
    Ok(EnvLoader::default().collect(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let value = loader.parse(r#"{"app": {"name": "trellis"}, "workers": 4}"#).unwrap();
        assert_eq!(value["app"]["name"], "trellis");
    }

    #[test]
    fn test_parse_toml_tables() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let value = loader
            .parse(
                r#"
                debug = true

                [database]
                host = "localhost"
                port = 5432
                "#,
            )
            .unwrap();
        assert_eq!(value, json!({"debug": true, "database": {"host": "localhost", "port": 5432}}));
    }

    #[test]
    fn test_parse_env_lines() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let value = loader
            .parse("# comment\nAPP_NAME=trellis\nCACHE__TTL=60\nQUOTED=\"two words\"\n")
            .unwrap();
        assert_eq!(value["app_name"], "trellis");
        assert_eq!(value["cache"]["ttl"], 60);
        assert_eq!(value["quoted"], "two words");
    }

    #[test]
    fn test_parse_errors_name_the_format() {
        let err = ConfigLoader::new(FileFormat::Toml).parse("= nope").unwrap_err();
        assert!(err.to_string().contains("TOML"));
        assert!(ConfigLoader::new(FileFormat::Json).parse("{").is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::detect(Path::new("config/app.toml")).unwrap(), FileFormat::Toml);
        assert_eq!(FileFormat::detect(Path::new(".env")).unwrap(), FileFormat::Env);
        assert!(FileFormat::detect(Path::new("settings.yaml")).is_err());
        assert!(FileFormat::detect(Path::new("Makefile")).is_err());
    }
}
