// Error types for configuration management

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to load configuration from {source_name}: {reason}")]
    LoadError { source_name: String, reason: String },

    #[error("Failed to parse {format} configuration: {reason}")]
    ParseError { format: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Failed to serialize value for '{key}': {reason}")]
    SerializationError { key: String, reason: String },

    #[error("Value at '{key}' cannot be read as {expected}: {reason}")]
    DeserializationError {
        key: String,
        expected: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for trellis_core::Error {
    fn from(err: ConfigError) -> Self {
        trellis_core::Error::Internal(format!("configuration: {}", err))
    }
}
