//! Scaling decision function and the control loop.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use swell_client::ServiceClient;
use swell_core::{AutoscalerConfig, ServiceStatus};

/// A scaling decision derived from one status snapshot.
///
/// Computed fresh each iteration and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Raise the replica count to the given value.
    ScaleUp(u32),
    /// Lower the replica count to the given value (always >= 1).
    ScaleDown(u32),
    /// Leave the replica count alone.
    NoChange,
}

/// What one loop iteration did, for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The status poll failed; decision and update were skipped.
    StatusUnavailable,
    /// CPU was on target (or the only available move was suppressed).
    Steady,
    /// A replica update was issued. `applied` is false if the write failed.
    Scaled { target: u32, applied: bool },
}

/// Compute the scaling decision for one status snapshot.
///
/// Pure function of its inputs. `target_cpu_usage` must be strictly
/// positive; config validation enforces that before the loop starts.
pub fn decide(
    status: &ServiceStatus,
    target_cpu_usage: f64,
    max_replicas: Option<u32>,
) -> ScaleDecision {
    let replicas = status.replicas;
    let ratio = status.cpu_high_priority() / target_cpu_usage;

    if ratio > 1.0 {
        let desired = ((replicas as f64) * ratio).ceil() as u32;
        let target = match max_replicas {
            Some(max) => desired.min(max),
            None => desired,
        };
        // The ceiling clamp (or a zero replica reading) can leave nothing
        // to do; never issue a write that wouldn't change the count.
        if target <= replicas {
            return ScaleDecision::NoChange;
        }
        ScaleDecision::ScaleUp(target)
    } else if ratio < 1.0 {
        let candidate = ((replicas as f64) * ratio).floor() as u32;
        if candidate >= 1 {
            ScaleDecision::ScaleDown(candidate)
        } else {
            // Scaling to zero is disallowed.
            ScaleDecision::NoChange
        }
    } else {
        ScaleDecision::NoChange
    }
}

/// The control loop: poll status, decide, apply, sleep, repeat.
pub struct Autoscaler {
    config: AutoscalerConfig,
    client: ServiceClient,
}

impl Autoscaler {
    /// Create an autoscaler over a validated config and its client.
    pub fn new(config: AutoscalerConfig, client: ServiceClient) -> Self {
        Self { config, client }
    }

    /// Run one iteration: poll, decide, apply.
    ///
    /// Never fails. A poll failure skips the decision entirely; a failed
    /// replica update is logged and dropped, with no retry and no state
    /// carried into the next iteration.
    pub async fn tick(&self) -> TickOutcome {
        let status = match self.client.fetch_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "failed to retrieve status, retrying next interval");
                return TickOutcome::StatusUnavailable;
            }
        };

        debug!(
            cpu = status.cpu_high_priority(),
            replicas = status.replicas,
            target = self.config.target_cpu_usage,
            "status polled"
        );

        match decide(&status, self.config.target_cpu_usage, self.config.max_replicas) {
            ScaleDecision::ScaleUp(target) => {
                info!(from = status.replicas, to = target, "scaling up");
                self.apply(target).await
            }
            ScaleDecision::ScaleDown(target) => {
                info!(from = status.replicas, to = target, "scaling down");
                self.apply(target).await
            }
            ScaleDecision::NoChange => TickOutcome::Steady,
        }
    }

    async fn apply(&self, target: u32) -> TickOutcome {
        match self.client.set_replicas(target).await {
            Ok(()) => TickOutcome::Scaled {
                target,
                applied: true,
            },
            Err(e) => {
                warn!(error = %e, target, "replica update failed");
                TickOutcome::Scaled {
                    target,
                    applied: false,
                }
            }
        }
    }

    /// Run the control loop until the shutdown signal fires.
    ///
    /// Iterations are strictly sequential: tick, then sleep for the
    /// polling interval, with the sleep raced against shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.polling_interval_ms,
            target_cpu = self.config.target_cpu_usage,
            "autoscaler started"
        );

        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.polling_interval()) => {}
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, put};
    use axum::{Json, Router};

    use swell_core::CpuReading;

    fn status(cpu: f64, replicas: u32) -> ServiceStatus {
        ServiceStatus {
            cpu: CpuReading { high_priority: cpu },
            replicas,
        }
    }

    fn test_config(base_url: &str) -> AutoscalerConfig {
        AutoscalerConfig {
            base_url: base_url.to_string(),
            target_cpu_usage: 50.0,
            polling_interval_ms: 10,
            request_timeout_ms: 2000,
            max_replicas: None,
        }
    }

    // ── Decision function ──────────────────────────────────────

    #[test]
    fn scales_up_when_cpu_above_target() {
        // CPU 60 against target 50 with 5 replicas: ratio 1.2, ceil(6.0) = 6.
        assert_eq!(
            decide(&status(60.0, 5), 50.0, None),
            ScaleDecision::ScaleUp(6)
        );
    }

    #[test]
    fn scale_up_rounds_toward_more_capacity() {
        // Ratio 1.02 with 5 replicas: 5.1 rounds up to 6, not down to 5.
        assert_eq!(
            decide(&status(51.0, 5), 50.0, None),
            ScaleDecision::ScaleUp(6)
        );
    }

    #[test]
    fn scale_up_target_never_below_current() {
        for cpu in [50.1, 55.0, 75.0, 200.0, 1000.0] {
            for replicas in [1, 3, 10] {
                match decide(&status(cpu, replicas), 50.0, None) {
                    ScaleDecision::ScaleUp(n) => assert!(n > replicas),
                    other => panic!("expected scale-up, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn scales_down_when_cpu_below_target() {
        // CPU 20 against target 50 with 5 replicas: ratio 0.4, floor(2.0) = 2.
        assert_eq!(
            decide(&status(20.0, 5), 50.0, None),
            ScaleDecision::ScaleDown(2)
        );
    }

    #[test]
    fn scale_down_rounds_toward_fewer_removals() {
        // Ratio 0.9 with 5 replicas: 4.5 floors to 4.
        assert_eq!(
            decide(&status(45.0, 5), 50.0, None),
            ScaleDecision::ScaleDown(4)
        );
    }

    #[test]
    fn never_scales_to_zero() {
        // Ratio 0.1 with 2 replicas: floor(0.2) = 0, which is suppressed.
        assert_eq!(decide(&status(5.0, 2), 50.0, None), ScaleDecision::NoChange);
    }

    #[test]
    fn no_change_when_cpu_on_target() {
        assert_eq!(
            decide(&status(50.0, 5), 50.0, None),
            ScaleDecision::NoChange
        );
    }

    #[test]
    fn decision_is_idempotent() {
        let snapshot = status(60.0, 5);
        let first = decide(&snapshot, 50.0, None);
        let second = decide(&snapshot, 50.0, None);
        assert_eq!(first, second);
        assert_eq!(first, ScaleDecision::ScaleUp(6));
    }

    #[test]
    fn respects_max_replicas() {
        // Ratio 20 with 1 replica wants 20, capped at 5.
        assert_eq!(
            decide(&status(1000.0, 1), 50.0, Some(5)),
            ScaleDecision::ScaleUp(5)
        );
    }

    #[test]
    fn clamp_to_current_count_becomes_no_change() {
        // Already at the ceiling; a write would be a no-op.
        assert_eq!(
            decide(&status(1000.0, 5), 50.0, Some(5)),
            ScaleDecision::NoChange
        );
    }

    #[test]
    fn zero_replica_reading_never_scales_up_to_zero() {
        // Degenerate report from the service; ceil(0 * ratio) = 0.
        assert_eq!(
            decide(&status(90.0, 0), 50.0, None),
            ScaleDecision::NoChange
        );
    }

    // ── Loop iterations against a mock service ─────────────────

    struct MockService {
        base_url: String,
        replica_writes: Arc<AtomicU32>,
        last_target: Arc<AtomicU32>,
    }

    /// Serve `/status` with a fixed snapshot and `/replicas` with the
    /// given status code, recording writes.
    async fn spawn_mock(cpu: f64, replicas: u32, put_status: StatusCode) -> MockService {
        let replica_writes = Arc::new(AtomicU32::new(0));
        let last_target = Arc::new(AtomicU32::new(0));

        let writes = replica_writes.clone();
        let target = last_target.clone();
        let routes = Router::new()
            .route(
                "/status",
                get(move || async move {
                    Json(serde_json::json!({
                        "cpu": { "highPriority": cpu },
                        "replicas": replicas
                    }))
                }),
            )
            .route(
                "/replicas",
                put(
                    move |State((writes, target)): State<(Arc<AtomicU32>, Arc<AtomicU32>)>,
                          Json(body): Json<serde_json::Value>| async move {
                        writes.fetch_add(1, Ordering::SeqCst);
                        if let Some(n) = body["replicas"].as_u64() {
                            target.store(n as u32, Ordering::SeqCst);
                        }
                        put_status
                    },
                ),
            )
            .with_state((writes, target));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes).await.unwrap();
        });

        MockService {
            base_url: format!("http://{addr}"),
            replica_writes,
            last_target,
        }
    }

    fn autoscaler_for(base_url: &str) -> Autoscaler {
        let config = test_config(base_url);
        let client = ServiceClient::new(&config).unwrap();
        Autoscaler::new(config, client)
    }

    #[tokio::test]
    async fn tick_scales_up_and_applies() {
        let mock = spawn_mock(60.0, 5, StatusCode::OK).await;
        let scaler = autoscaler_for(&mock.base_url);

        let outcome = scaler.tick().await;
        assert_eq!(
            outcome,
            TickOutcome::Scaled {
                target: 6,
                applied: true
            }
        );
        assert_eq!(mock.replica_writes.load(Ordering::SeqCst), 1);
        assert_eq!(mock.last_target.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn tick_on_target_issues_no_write() {
        let mock = spawn_mock(50.0, 5, StatusCode::OK).await;
        let scaler = autoscaler_for(&mock.base_url);

        assert_eq!(scaler.tick().await, TickOutcome::Steady);
        assert_eq!(mock.replica_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tick_survives_unreachable_service() {
        // Nothing listens on port 1; the poll fails and the iteration ends.
        let scaler = autoscaler_for("http://127.0.0.1:1");

        assert_eq!(scaler.tick().await, TickOutcome::StatusUnavailable);
        // A second iteration behaves identically: no state accumulates.
        assert_eq!(scaler.tick().await, TickOutcome::StatusUnavailable);
    }

    #[tokio::test]
    async fn tick_drops_failed_update_without_retry() {
        let mock = spawn_mock(60.0, 5, StatusCode::INTERNAL_SERVER_ERROR).await;
        let scaler = autoscaler_for(&mock.base_url);

        let outcome = scaler.tick().await;
        assert_eq!(
            outcome,
            TickOutcome::Scaled {
                target: 6,
                applied: false
            }
        );
        // Exactly one write attempt; the failed update is not re-attempted.
        assert_eq!(mock.replica_writes.load(Ordering::SeqCst), 1);

        // The next iteration polls again as if nothing happened.
        let outcome = scaler.tick().await;
        assert_eq!(
            outcome,
            TickOutcome::Scaled {
                target: 6,
                applied: false
            }
        );
        assert_eq!(mock.replica_writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let mock = spawn_mock(50.0, 5, StatusCode::OK).await;
        let scaler = autoscaler_for(&mock.base_url);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scaler.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop after shutdown")
            .unwrap();
    }
}
