//! swell-core — configuration and domain types for the Swell autoscaler.
//!
//! `AutoscalerConfig` is built once at startup, validated, and shared
//! read-only with every component for the lifetime of the process.
//! `ServiceStatus` is the wire shape reported by the monitored service's
//! `/status` endpoint.

pub mod config;
pub mod types;

pub use config::{AutoscalerConfig, ConfigError};
pub use types::{CpuReading, ServiceStatus};
