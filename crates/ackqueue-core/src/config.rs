//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Queue configuration.
///
/// Only the options the queue itself interprets live here. Connection
/// settings belong to the backend and are handed to it separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue name, used as the key prefix in the backend.
    #[serde(default = "default_name")]
    pub name: String,

    /// Age after which an unresolved delivery is reclaimed (None = reclaimer disabled).
    #[serde(
        default = "default_autoclean_interval",
        rename = "autoclean_interval_secs",
        with = "autoclean_secs"
    )]
    pub autoclean_interval: Option<Duration>,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_autoclean_interval() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            autoclean_interval: default_autoclean_interval(),
        }
    }
}

impl QueueConfig {
    /// Create a config for the named queue with default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the autoclean interval.
    pub fn with_autoclean_interval(mut self, interval: Duration) -> Self {
        self.autoclean_interval = Some(interval);
        self
    }

    /// Disable the reclaimer.
    pub fn without_autoclean(mut self) -> Self {
        self.autoclean_interval = None;
        self
    }

    /// Check the config before a queue is built from it.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.name.is_empty() {
            return Err(QueueError::Config("queue name must not be empty".to_string()));
        }
        if self.name.contains(':') {
            return Err(QueueError::Config(format!(
                "queue name '{}' must not contain ':'",
                self.name
            )));
        }
        if self.autoclean_interval == Some(Duration::ZERO) {
            return Err(QueueError::Config(
                "autoclean interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Seconds as a float; zero or negative means disabled.
mod autoclean_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(value.map(|d| d.as_secs_f64()).unwrap_or(0.0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = f64::deserialize(d)?;
        if secs.is_nan() || secs <= 0.0 {
            return Ok(None);
        }
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("autoclean_interval_secs {}: {}", secs, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.autoclean_interval, Some(Duration::from_secs(60)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = QueueConfig::named("jobs").with_autoclean_interval(Duration::from_millis(500));
        assert_eq!(config.name, "jobs");
        assert_eq!(config.autoclean_interval, Some(Duration::from_millis(500)));

        let config = config.without_autoclean();
        assert_eq!(config.autoclean_interval, None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn test_deserialize_interval() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"name": "x", "autoclean_interval_secs": 1.5}"#).unwrap();
        assert_eq!(config.autoclean_interval, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_deserialize_zero_disables() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"autoclean_interval_secs": 0}"#).unwrap();
        assert_eq!(config.autoclean_interval, None);

        let config: QueueConfig =
            serde_json::from_str(r#"{"autoclean_interval_secs": -1}"#).unwrap();
        assert_eq!(config.autoclean_interval, None);
    }

    #[test]
    fn test_deserialize_out_of_range_interval_is_error() {
        let result = serde_json::from_str::<QueueConfig>(r#"{"autoclean_interval_secs": 1e30}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("autoclean_interval_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(QueueConfig::named("").validate().is_err());
        assert!(QueueConfig::named("a:b").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = QueueConfig::default().with_autoclean_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(QueueError::Config(_))));
    }
}
