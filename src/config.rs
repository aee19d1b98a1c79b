//! Configuration for templates, stream containers and the redelivery job.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use redis_mq::MqConfig;
//!
//! let config = MqConfig::from_json(r#"{"application_name": "billing"}"#).unwrap();
//! assert_eq!(config.application_name, "billing");
//! assert_eq!(config.stream_batch_size, 10);
//! assert_eq!(config.redelivery.expire_after_secs, 300);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::job::Schedule;

/// Lock key the redelivery job single-flights on across the cluster.
pub const DEFAULT_LOCK_KEY: &str = "redis:pending:msg:lock";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqConfig {
    /// Logical service name; the default consumer group of stream listeners.
    pub application_name: String,
    /// This process's name inside consumer groups.
    pub consumer_name: String,
    /// Maximum entries read per stream per poll.
    pub stream_batch_size: usize,
    /// Idle wait between stream polls that returned nothing.
    pub poll_interval_ms: u64,
    pub redelivery: RedeliveryConfig,
}

impl Default for MqConfig {
    fn default() -> Self {
        Self {
            application_name: "application".to_string(),
            consumer_name: default_consumer_name(),
            stream_batch_size: 10,
            poll_interval_ms: 100,
            redelivery: RedeliveryConfig::default(),
        }
    }
}

impl MqConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Default config for the named application.
    pub fn for_application(name: impl Into<String>) -> Self {
        Self {
            application_name: name.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedeliveryConfig {
    pub lock_key: String,
    /// Pending entries at least this old are re-appended.
    pub expire_after_secs: u64,
    pub period_secs: u64,
    /// Offset of each run within the period, to stay clear of the top of
    /// the minute.
    pub offset_secs: u64,
}

impl Default for RedeliveryConfig {
    fn default() -> Self {
        Self {
            lock_key: DEFAULT_LOCK_KEY.to_string(),
            expire_after_secs: 300,
            period_secs: 60,
            offset_secs: 35,
        }
    }
}

impl RedeliveryConfig {
    pub fn expire_after(&self) -> Duration {
        Duration::from_secs(self.expire_after_secs)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(
            Duration::from_secs(self.period_secs),
            Duration::from_secs(self.offset_secs),
        )
    }
}

/// `<host>@<pid>`, so every process is a distinct group member.
pub fn default_consumer_name() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}@{}", host, std::process::id())
}
