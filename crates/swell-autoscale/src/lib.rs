//! swell-autoscale — CPU-driven replica scaling.
//!
//! Polls the monitored service's status, compares the high-priority CPU
//! reading against `AutoscalerConfig.target_cpu_usage`, and issues replica
//! updates through [`swell_client::ServiceClient`].
//!
//! # Scaling Algorithm
//!
//! ```text
//! ratio = cpu_high_priority / target_cpu_usage
//!
//! if ratio > 1:
//!     ScaleUp(ceil(replicas * ratio))      // clamped to max_replicas if set
//!
//! if ratio < 1:
//!     candidate = floor(replicas * ratio)
//!     ScaleDown(candidate) if candidate >= 1 else NoChange
//!
//! if ratio == 1:
//!     NoChange
//! ```
//!
//! Rounding is asymmetric on purpose: scale-up rounds toward more
//! capacity, scale-down rounds toward fewer removals, and a scale-down
//! below one replica is suppressed entirely.
//!
//! Every failure in the loop is soft. A failed poll skips the iteration,
//! a failed update drops that iteration's action, and in both cases the
//! loop comes back after the polling interval.

pub mod scaler;

pub use scaler::{decide, Autoscaler, ScaleDecision, TickOutcome};
