//! swelld — the Swell autoscaler daemon.
//!
//! Single binary that assembles the autoscaler:
//! - Configuration (TOML file + CLI overrides, validated at startup)
//! - Service client (status reads, replica writes)
//! - Scaling loop
//! - Liveness HTTP endpoint
//!
//! # Usage
//!
//! ```text
//! swelld --config swell.toml
//! swelld --base-url http://10.0.0.5:8080/app --target-cpu 50 --interval-ms 5000
//! ```

mod health;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use swell_autoscale::Autoscaler;
use swell_client::ServiceClient;
use swell_core::AutoscalerConfig;

#[derive(Parser)]
#[command(name = "swelld", about = "Swell autoscaler daemon")]
struct Cli {
    /// Path to a swell.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endpoint root of the monitored service (overrides the file).
    #[arg(long)]
    base_url: Option<String>,

    /// Target CPU utilization to steer toward (overrides the file).
    #[arg(long)]
    target_cpu: Option<f64>,

    /// Polling interval in milliseconds (overrides the file).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds (overrides the file).
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Optional ceiling on scale-up targets (overrides the file).
    #[arg(long)]
    max_replicas: Option<u32>,

    /// Port for the liveness endpoint.
    #[arg(long, default_value = "8080")]
    port: u16,
}

/// Resolve the effective config: file first, then CLI overrides, then
/// validation. Any invalid value aborts startup before the loop runs.
fn resolve_config(cli: &Cli) -> anyhow::Result<AutoscalerConfig> {
    let mut config = match &cli.config {
        Some(path) => AutoscalerConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AutoscalerConfig {
            base_url: String::new(),
            target_cpu_usage: 0.0,
            polling_interval_ms: 0,
            request_timeout_ms: 10_000,
            max_replicas: None,
        },
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(target_cpu) = cli.target_cpu {
        config.target_cpu_usage = target_cpu;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.polling_interval_ms = interval_ms;
    }
    if let Some(timeout_ms) = cli.request_timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(max_replicas) = cli.max_replicas {
        config.max_replicas = Some(max_replicas);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,swelld=debug,swell=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    info!(
        base_url = %config.base_url,
        target_cpu = config.target_cpu_usage,
        interval_ms = config.polling_interval_ms,
        "swell daemon starting"
    );

    let client = ServiceClient::new(&config)?;
    let autoscaler = Autoscaler::new(config, client);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Scaling loop ───────────────────────────────────────────

    let scaler_handle = tokio::spawn(async move {
        autoscaler.run(shutdown_rx).await;
    });

    // ── Liveness endpoint ──────────────────────────────────────

    let router = health::build_router();
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));

    info!(%addr, "liveness endpoint starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the loop to finish its current iteration.
    let _ = scaler_handle.await;

    info!("swell daemon stopped");
    Ok(())
}
