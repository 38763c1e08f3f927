//! `run` command implementation.
//!
//! Drives a CARLA server; built without `real-carla` it runs against the mock
//! simulator instead.

use std::future::Future;

use anyhow::{Context, Result};
use contracts::TrafficConfig;
use observability::TelemetryAggregator;
use tracing::{info, warn};
use traffic::{RunOutcome, RunReport, TrafficOrchestrator};

use crate::cli::RunArgs;
use crate::output::write_report;

/// Execute the `run` command
pub async fn run_traffic(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.apply_overrides(&mut config);
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        host = %config.carla.host,
        port = config.carla.port,
        vehicles = config.vehicles.count,
        pedestrians = config.pedestrians.count,
        iterations = config.sampling.iterations,
        clock_mode = ?config.world.clock_mode,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    // installed before connecting so an interrupt while populating still tears down
    let shutdown = install_shutdown_signal()?;
    let report = run_orchestrator(config, shutdown).await?;

    match &report.outcome {
        RunOutcome::Completed => info!("Traffic run completed"),
        RunOutcome::Interrupted => warn!("Traffic run interrupted by shutdown signal"),
        RunOutcome::Aborted { reason } => warn!(%reason, "Traffic run aborted"),
    }
    if !report.teardown.is_clean() {
        warn!(teardown = ?report.teardown, "Some actors could not be cleaned up");
    }

    if let Some(path) = &args.output {
        write_report(path, &report)
            .with_context(|| format!("Failed to write samples to {}", path.display()))?;
        info!(path = %path.display(), samples = report.samples.len(), "Samples written");
    }

    let summary = report.samples.iter().collect::<TelemetryAggregator>().summary();
    println!("{summary}");

    info!("CARLA Traffic finished");
    Ok(())
}

#[cfg(feature = "real-carla")]
async fn run_orchestrator(
    config: TrafficConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<RunReport> {
    use actor_factory::RealCarlaClient;

    let mut orchestrator = TrafficOrchestrator::from_config(config, RealCarlaClient::new())
        .context("Failed to prepare traffic run")?;
    orchestrator
        .start(shutdown)
        .await
        .context("Traffic run failed")
}

#[cfg(not(feature = "real-carla"))]
async fn run_orchestrator(
    config: TrafficConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<RunReport> {
    use actor_factory::MockCarlaClient;

    info!("Built without real-carla, running against the mock simulator");
    let mut orchestrator = TrafficOrchestrator::from_config(config, MockCarlaClient::new())
        .context("Failed to prepare traffic run")?;
    orchestrator
        .start(shutdown)
        .await
        .context("Traffic run failed")
}

/// Register the Ctrl+C and SIGTERM handlers now and return a future that
/// resolves once either signal arrives.
fn install_shutdown_signal() -> Result<impl Future<Output = ()>> {
    let (tx, mut rx) = tokio::sync::watch::channel(false);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt =
            signal(SignalKind::interrupt()).context("Failed to install Ctrl+C handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => {},
                _ = terminate.recv() => {},
            }
            warn!("Received shutdown signal, stopping traffic run...");
            let _ = tx.send(true);
        });
    }

    #[cfg(not(unix))]
    {
        let mut ctrl_c =
            tokio::signal::windows::ctrl_c().context("Failed to install Ctrl+C handler")?;
        tokio::spawn(async move {
            ctrl_c.recv().await;
            warn!("Received shutdown signal, stopping traffic run...");
            let _ = tx.send(true);
        });
    }

    Ok(async move {
        if rx.wait_for(|&stop| stop).await.is_err() {
            // handler task gone without a signal
            std::future::pending::<()>().await;
        }
    })
}
