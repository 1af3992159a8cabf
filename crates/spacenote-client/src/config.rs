//! Client configuration.
//!
//! Values come from [`ClientConfig::default`] (see `spacenote_core::defaults`)
//! and can be overridden through `SPACENOTE_*` environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use spacenote_core::defaults;

use crate::image::PollPolicy;
use crate::retry::RetryPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for spacenote_core::Error {
    fn from(e: ConfigError) -> Self {
        spacenote_core::Error::Config(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Environment variable names.
pub mod env_vars {
    pub const API_URL: &str = "SPACENOTE_API_URL";
    pub const TIMEOUT_SECS: &str = "SPACENOTE_TIMEOUT_SECS";
    pub const MAX_RETRIES: &str = "SPACENOTE_MAX_RETRIES";
    pub const IMAGE_POLL_MAX_RETRIES: &str = "SPACENOTE_IMAGE_POLL_MAX_RETRIES";
    pub const NOTIFICATION_CAPACITY: &str = "SPACENOTE_NOTIFICATION_CAPACITY";
    pub const CACHE_CAPACITY: &str = "SPACENOTE_CACHE_CAPACITY";
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend origin, without the `api/v1` prefix.
    pub base_url: String,
    pub timeout: Duration,
    /// Retry policy for reads. Mutations are never retried.
    pub retry: RetryPolicy,
    pub image_poll: PollPolicy,
    pub notification_capacity: usize,
    /// Query keys held by the read cache.
    pub cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            image_poll: PollPolicy::default(),
            notification_capacity: defaults::NOTIFICATION_CAPACITY,
            cache_capacity: defaults::QUERY_CACHE_CAPACITY,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by whatever `SPACENOTE_*` variables are set.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var(env_vars::API_URL) {
            config.base_url = url;
        }
        if let Some(secs) = env_parse::<u64>(env_vars::TIMEOUT_SECS) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env_parse::<u32>(env_vars::MAX_RETRIES) {
            config.retry.max_retries = retries;
        }
        if let Some(retries) = env_parse::<u32>(env_vars::IMAGE_POLL_MAX_RETRIES) {
            config.image_poll.max_retries = retries;
        }
        if let Some(capacity) = env_parse::<usize>(env_vars::NOTIFICATION_CAPACITY) {
            config.notification_capacity = capacity;
        }
        if let Some(capacity) = env_parse::<usize>(env_vars::CACHE_CAPACITY) {
            config.cache_capacity = capacity;
        }
        debug!(
            subsystem = "client",
            component = "config",
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            max_retries = config.retry.max_retries,
            "Loaded client configuration"
        );
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation("timeout must be positive".into()));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::Validation(
                "retry base delay exceeds max delay".into(),
            ));
        }
        if self.image_poll.factor < 1.0 {
            return Err(ConfigError::Validation(
                "image poll factor must be at least 1.0".into(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Validation(
                "notification capacity must be positive".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "cache capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn origin(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.origin(), "http://127.0.0.1:3100");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = ClientConfig::new("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_rejects_zero_cache_capacity() {
        let config = ClientConfig {
            cache_capacity: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_origin_strips_trailing_slash() {
        let config = ClientConfig::new("https://notes.example.com/");
        assert_eq!(config.origin(), "https://notes.example.com");
    }

    #[test]
    fn test_config_error_converts_to_core_error() {
        let err: spacenote_core::Error = ConfigError::Validation("x".into()).into();
        assert_eq!(err.to_string(), "Configuration error: Validation error: x");
    }
}
