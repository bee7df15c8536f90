// Dispatcher configuration
//
// Settings can be built in code or loaded from a RON or JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default prefix for worker thread names
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "async-cmd";

/// Default time an idle worker waits for work before retiring
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10_000;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
}

/// Settings for a [`crate::dispatch::Dispatcher`] and its worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Workers are named `{prefix}-0`, `{prefix}-1`, ...
    pub thread_name_prefix: String,

    /// Upper bound on live worker threads; `None` lets the pool grow as needed
    pub max_workers: Option<usize>,

    /// How long an idle worker waits for work before exiting
    pub idle_timeout_ms: u64,

    /// Stack size for worker threads; `None` uses the platform default
    pub stack_size: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            max_workers: None,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            stack_size: None,
        }
    }
}

impl DispatcherConfig {
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Check the settings for values the pool cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "thread_name_prefix must not be empty".into(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::Invalid(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a RON document
    pub fn from_ron_str(ron_data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron_data).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to deserialize from RON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json_data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_data).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to deserialize from JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize to RON: {}", e))
        })
    }

    /// Load a configuration file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&data),
            Some("json") => Self::from_json_str(&data),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
