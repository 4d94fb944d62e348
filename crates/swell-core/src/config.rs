//! swell.toml configuration parser and startup validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Default per-request timeout for outbound calls, in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while validating the autoscaler configuration.
///
/// All of these are fatal at startup; the control loop never runs with
/// an invalid config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base_url must be a non-empty http URL, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("target_cpu_usage must be strictly positive, got {0}")]
    NonPositiveTargetCpu(f64),

    #[error("polling_interval_ms must be strictly positive")]
    ZeroPollingInterval,

    #[error("request_timeout_ms must be strictly positive")]
    ZeroRequestTimeout,

    #[error("max_replicas must be at least 1 when set")]
    ZeroMaxReplicas,
}

/// Process-lifetime autoscaler configuration.
///
/// Constructed once at startup (TOML file plus CLI overrides), validated
/// with [`AutoscalerConfig::validate`], and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscalerConfig {
    /// Endpoint root of the monitored service, e.g. `http://10.0.0.5:8080/app`.
    pub base_url: String,
    /// CPU utilization level the loop steers toward. Strictly positive:
    /// the decision function divides by it.
    pub target_cpu_usage: f64,
    /// Delay between control-loop iterations.
    pub polling_interval_ms: u64,
    /// Timeout applied to each outbound request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional ceiling on scale-up targets. `None` leaves scale-up unbounded.
    #[serde(default)]
    pub max_replicas: Option<u32>,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl AutoscalerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AutoscalerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check every startup invariant.
    ///
    /// `target_cpu_usage` is a divisor and `polling_interval_ms` drives the
    /// sleep between iterations; neither may be zero or negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() || !self.base_url.starts_with("http://") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if !(self.target_cpu_usage > 0.0) {
            return Err(ConfigError::NonPositiveTargetCpu(self.target_cpu_usage));
        }
        if self.polling_interval_ms == 0 {
            return Err(ConfigError::ZeroPollingInterval);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.max_replicas == Some(0) {
            return Err(ConfigError::ZeroMaxReplicas);
        }
        Ok(())
    }

    /// Delay between control-loop iterations.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Timeout applied to each outbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
