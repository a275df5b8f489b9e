//! CLI entry point for the reconcile subcommand.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use xpanel_config::{
    CliOverrides, Config, apply_overrides, init_tracing, load_or_default, validate_config,
};

use crate::reconciler::Reconciler;
use crate::report::PassReport;

/// CLI arguments for the reconcile subcommand.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "xpanel-reconcile",
    version,
    about = "Remove expired and over-quota clients, then resync the engine"
)]
pub struct ReconcileArgs {
    /// Panel config file (TOML, YAML or JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: ReconcileCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReconcileCommand {
    /// Delete clients past their expiry.
    Expiry,
    /// Collect traffic and delete clients over quota.
    Quota,
    /// Expiry pass, then quota pass.
    All,
    /// Run both passes on a fixed interval until interrupted.
    Watch {
        /// Seconds between runs (defaults to reconcile.interval_secs).
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Run the reconciler with the given CLI arguments.
pub async fn run(args: ReconcileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args)?;
    init_tracing(&config.logging);

    let reconciler = Reconciler::from_config(&config)?;
    let now = chrono::Local::now().naive_local();

    let report = match args.command {
        ReconcileCommand::Expiry => reconciler.expiry_pass(now).await?,
        ReconcileCommand::Quota => reconciler.quota_pass(now).await?,
        ReconcileCommand::All => reconciler.run_all(now).await?,
        ReconcileCommand::Watch { interval } => {
            let secs = interval.unwrap_or(config.reconcile.interval_secs);
            if secs == 0 {
                return Err("watch interval must be > 0".into());
            }
            info!(
                version = xpanel_core::VERSION,
                interval_secs = secs,
                "reconciler watching"
            );

            let shutdown = CancellationToken::new();
            let shutdown_signal = shutdown.clone();
            tokio::spawn(async move {
                shutdown_signal_handler().await;
                info!("shutdown signal received");
                shutdown_signal.cancel();
            });

            watch(&reconciler, Duration::from_secs(secs), shutdown).await;
            return Ok(());
        }
    };

    print_report(&report);
    Ok(())
}

fn load(args: &ReconcileArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Run both passes on every tick until `shutdown` fires. A pass in progress
/// is allowed to finish.
async fn watch(reconciler: &Reconciler, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("reconciler stopped");
                return;
            }

            _ = ticker.tick() => {
                match reconciler.run_now().await {
                    Ok(report) => log_report(&report),
                    Err(e) => error!(error = %e, "reconcile run failed"),
                }
            }
        }
    }
}

fn log_report(report: &PassReport) {
    for failure in &report.failures {
        warn!(%failure, "reconcile step failed");
    }
    info!(
        checked = report.checked,
        removed = report.removed.len(),
        usage_updates = report.usage_updates.len(),
        failures = report.failures.len(),
        restarted = report.restarted,
        "reconcile run finished"
    );
}

fn print_report(report: &PassReport) {
    for name in &report.removed {
        println!("removed {name}");
    }
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
    println!("{report}");
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use xpanel_engine::fake::{RecordingControl, ScriptedStats};
    use xpanel_render::{RenderSettings, Synthesizer};
    use xpanel_store::MemoryStore;

    use super::*;

    #[test]
    fn parses_watch_with_overrides() {
        let args = ReconcileArgs::try_parse_from([
            "xpanel-reconcile",
            "--db-clients",
            "/tmp/c.db",
            "watch",
            "--interval",
            "60",
        ])
        .unwrap();
        assert_eq!(args.overrides.db_clients.as_deref(), Some("/tmp/c.db"));
        assert!(matches!(args.command, ReconcileCommand::Watch { interval: Some(60) }));
    }

    #[test]
    fn load_applies_overrides_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.toml");
        std::fs::write(&path, "[reconcile]\nstats_timeout_secs = 9\n").unwrap();

        let args = ReconcileArgs::try_parse_from([
            "xpanel-reconcile",
            "-c",
            path.to_str().unwrap(),
            "--db-inbounds",
            "/tmp/i.db",
            "all",
        ])
        .unwrap();
        let config = load(&args).unwrap();
        assert_eq!(config.reconcile.stats_timeout_secs, 9);
        assert_eq!(config.store.inbounds_path, "/tmp/i.db");
    }

    #[tokio::test]
    async fn watch_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = Reconciler::new(
            Arc::new(MemoryStore::new()),
            Synthesizer::new(dir.path().join("config.json"), RenderSettings::default()),
            Arc::new(ScriptedStats::new()),
            Arc::new(RecordingControl::new()),
        );
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(
            Duration::from_secs(5),
            watch(&reconciler, Duration::from_secs(3600), shutdown),
        )
        .await
        .unwrap();
    }
}
