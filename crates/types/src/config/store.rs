//! Persistent store configuration.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Minimum cache size: 1 MB.
const MIN_CACHE_SIZE_BYTES: usize = 1024 * 1024;

fn default_cache_size() -> usize {
    64 * 1024 * 1024 // 64 MB
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Persistent store configuration.
///
/// # Validation Rules
///
/// - `cache_size_bytes` must be >= 1 MB (1,048,576 bytes)
/// - `drain_timeout` must be > 0
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use jetledger_types::config::StoreConfig;
/// let config = StoreConfig::builder()
///     .cache_size_bytes(128 * 1024 * 1024)
///     .drain_timeout(Duration::from_secs(10))
///     .build()
///     .expect("valid store config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    /// Page cache size handed to the storage engine, in bytes.
    #[serde(default = "default_cache_size")]
    pub cache_size_bytes: usize,
    /// How long jet drop finalization waits for in-flight writers of the
    /// pulse before giving up with a drain timeout.
    #[serde(default = "default_drain_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub drain_timeout: Duration,
}

#[bon::bon]
impl StoreConfig {
    /// Creates a new store configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `cache_size_bytes` < 1 MB
    /// - `drain_timeout` is zero
    #[builder]
    pub fn new(
        #[builder(default = default_cache_size())] cache_size_bytes: usize,
        #[builder(default = default_drain_timeout())] drain_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { cache_size_bytes, drain_timeout };
        config.validate()?;
        Ok(config)
    }
}

impl StoreConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size_bytes < MIN_CACHE_SIZE_BYTES {
            return Err(ConfigError::Validation {
                message: format!(
                    "cache_size_bytes must be >= {} (1 MB), got {}",
                    MIN_CACHE_SIZE_BYTES, self.cache_size_bytes
                ),
            });
        }
        if self.drain_timeout.is_zero() {
            return Err(ConfigError::Validation {
                message: "drain_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { cache_size_bytes: default_cache_size(), drain_timeout: default_drain_timeout() }
    }
}
