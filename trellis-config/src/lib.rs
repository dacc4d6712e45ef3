// Configuration management for the Trellis framework

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;
mod path;
pub mod validation;

pub use builder::ConfigBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use trellis_core::Container;

/// Shared configuration tree addressed by dotted paths.
///
/// Clones share the same tree. Later sources override earlier ones key by
/// key, so load defaults first and the environment last.
///
/// ```ignore
/// let config = ConfigManager::with_prefix("APP");
/// config.load_file("config/app.toml")?;
/// config.load_env();
///
/// let port: u16 = config.get("server.port")?;
/// ```
#[derive(Clone)]
pub struct ConfigManager {
    tree: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    /// Manager whose environment loading only reads `PREFIX_*` variables.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    pub fn from_value(value: Value) -> Self {
        Self {
            tree: Arc::new(RwLock::new(value)),
            env_prefix: None,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    // ========== Loading ==========

    /// Merge the process environment (see [`EnvLoader`]).
    pub fn load_env(&self) {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.merge_value(loader.load());
        debug!(prefix = ?self.env_prefix, "Loaded configuration from environment");
    }

    /// Merge `(name, value)` pairs as if they were environment variables.
    pub fn load_env_from<I, K, V>(&self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.merge_value(loader.collect(vars));
    }

    /// Export a `.env` file into the process environment, then merge the
    /// environment. Without a path a missing `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError {
                    source_name: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    trace!(error = %e, "No .env file loaded");
                }
            }
        }
        self.load_env();
        Ok(())
    }

    /// Merge a file, detecting the format from its name.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file_as(path, FileFormat::detect(path)?)
    }

    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let value = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(value);
        debug!(path = %path.display(), format = format.name(), "Loaded configuration file");
        Ok(())
    }

    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let value = ConfigLoader::new(format).parse(content)?;
        self.merge_value(value);
        Ok(())
    }

    // ========== Access ==========

    /// Store `value` at `key`, creating intermediate tables.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::SerializationError {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        path::insert(&mut self.tree.write(), key, value);
        trace!(key, "Configuration value set");
        Ok(())
    }

    /// Read the value at `key` as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get_value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Raw JSON value at `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        path::lookup(&self.tree.read(), key).cloned()
    }

    /// String at `key`; numbers and booleans are rendered as text.
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.get_value(key) {
            Some(Value::String(s)) => Ok(s),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(_) => self.get(key),
            None => Err(ConfigError::KeyNotFound(key.to_string())),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        path::lookup(&self.tree.read(), key).is_some()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        path::remove(&mut self.tree.write(), key)
    }

    /// Dotted paths of every leaf value, sorted.
    pub fn keys(&self) -> Vec<String> {
        path::leaf_paths(&self.tree.read())
    }

    /// A copy of the whole tree.
    pub fn to_value(&self) -> Value {
        self.tree.read().clone()
    }

    // ========== Combining ==========

    /// Deep-merge another manager's tree into this one.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.tree, &other.tree) {
            return;
        }
        self.merge_value(other.to_value());
    }

    pub fn merge_value(&self, value: Value) {
        path::merge(&mut self.tree.write(), value);
    }

    /// Deserialize the table at `key` (or the whole tree for `""`) and
    /// validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self, key: &str) -> Result<T> {
        let section: T = self.get(key)?;
        section.validate()?;
        Ok(section)
    }

    /// Register this manager in `container` so factories and handlers can
    /// take an `Arc<ConfigManager>` parameter.
    pub fn register(&self, container: &Container) {
        container.instance(self.clone());
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("env_prefix", &self.env_prefix)
            .field("keys", &self.keys().len())
            .finish()
    }
}
