//! Configuration types for vtool-client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable overriding [`ApiConfig::base_url`]
pub const API_URL_ENV: &str = "VTOOL_API_URL";

/// Default backend origin
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Backend connection settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API origin (default: "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for submission and image requests (None = no timeout)
    ///
    /// Status fetches use [`PollingConfig::fetch_timeout`] instead.
    #[serde(default, with = "optional_duration_millis")]
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: None,
        }
    }
}

/// Status polling behavior
///
/// The defaults poll every second, wait indefinitely on a slow fetch and never
/// give up on a task because of failed fetches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between the end of one fetch and the start of the next (default: 1000ms)
    #[serde(default = "default_poll_interval", with = "duration_millis")]
    pub interval: Duration,

    /// Abandon a single fetch after this long and count it as failed (None = wait)
    #[serde(default, with = "optional_duration_millis")]
    pub fetch_timeout: Option<Duration>,

    /// Stop polling after this many failed fetches in a row (None = never stop)
    ///
    /// A successful fetch resets the count.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            fetch_timeout: None,
            max_consecutive_failures: None,
        }
    }
}

/// Main configuration for the client, poller and orchestrators
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling behavior
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Config {
    /// Defaults with the base URL taken from `VTOOL_API_URL` when set
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                tracing::debug!(base_url = %url, "using API origin from environment");
                config.api.base_url = url.to_string();
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise fail later at request time
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.api.base_url, e),
            key: Some("api.base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!(
                    "base URL must use http or https, got '{}'",
                    parsed.scheme()
                ),
                key: Some("api.base_url".to_string()),
            });
        }
        if self.polling.interval.is_zero() {
            return Err(Error::Config {
                message: "polling interval must be greater than zero".to_string(),
                key: Some("polling.interval".to_string()),
            });
        }
        if self.polling.max_consecutive_failures == Some(0) {
            return Err(Error::Config {
                message: "max_consecutive_failures must be at least 1 when set".to_string(),
                key: Some("polling.max_consecutive_failures".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

// Duration serialization helper (milliseconds)
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper (milliseconds)
mod optional_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
