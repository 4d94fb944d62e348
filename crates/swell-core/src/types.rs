//! Wire types reported by the monitored service.

use serde::{Deserialize, Serialize};

/// CPU utilization block inside a status report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuReading {
    /// Utilization of the high-priority workload; drives scaling.
    pub high_priority: f64,
}

/// One status snapshot from `GET {base_url}/status`.
///
/// Created fresh on every successful poll and discarded at the end of the
/// iteration; nothing is carried across polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub cpu: CpuReading,
    /// Current replica count of the monitored service.
    pub replicas: u32,
}

impl ServiceStatus {
    /// The CPU reading the decision function consumes.
    pub fn cpu_high_priority(&self) -> f64 {
        self.cpu.high_priority
    }
}
