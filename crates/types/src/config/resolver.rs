//! Shard resolver configuration: retry budget and remote fetch timeout.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound on the retry budget. Anything larger means a misconfiguration
/// rather than a slow network.
const MAX_RETRIES_LIMIT: u32 = 100;

fn default_max_retries() -> u32 {
    10
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Configuration for shard resolution.
///
/// The retry budget and the per-attempt timeout are independent: a peer that
/// never answers costs one attempt per `fetch_timeout`, never more.
///
/// # Validation Rules
///
/// - `max_retries` must be <= 100
/// - `fetch_timeout` must be > 0
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use jetledger_types::config::ResolverConfig;
/// let config = ResolverConfig::builder()
///     .max_retries(5)
///     .fetch_timeout(Duration::from_secs(2))
///     .build()
///     .expect("valid resolver config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolverConfig {
    /// Maximum remote fetches for a single resolution.
    ///
    /// Zero means a stale local answer fails immediately without asking a peer.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Timeout for one "describe jet" round trip.
    #[serde(default = "default_fetch_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub fetch_timeout: Duration,
}

#[bon::bon]
impl ResolverConfig {
    /// Creates a new resolver configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `max_retries` > 100
    /// - `fetch_timeout` is zero
    #[builder]
    pub fn new(
        #[builder(default = default_max_retries())] max_retries: u32,
        #[builder(default = default_fetch_timeout())] fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_retries, fetch_timeout };
        config.validate()?;
        Ok(config)
    }
}

impl ResolverConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Validation {
                message: format!(
                    "max_retries must be <= {}, got {}",
                    MAX_RETRIES_LIMIT, self.max_retries
                ),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::Validation {
                message: "fetch_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_retries: default_max_retries(), fetch_timeout: default_fetch_timeout() }
    }
}
