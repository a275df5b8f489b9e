//! Unified xpanel CLI.
//!
//! This binary provides a unified interface to all xpanel components:
//! - `xpanel admin` - Manage clients and inbounds
//! - `xpanel reconcile` - Enforce expiry and quota limits
//!
//! Each subcommand can also be run as a standalone binary (`xpanel-admin`,
//! `xpanel-reconcile`).

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// xpanel unified CLI.
#[derive(Parser)]
#[command(
    name = "xpanel",
    version,
    about = "Client and endpoint manager for an Xray proxy engine",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clients and inbounds.
    #[command(name = "admin")]
    Admin(Box<xpanel_admin::AdminArgs>),

    /// Remove expired and over-quota clients.
    #[command(name = "reconcile", alias = "cron")]
    Reconcile(Box<xpanel_reconcile::ReconcileArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Admin(args) => xpanel_admin::cli::run(*args).await,
        Commands::Reconcile(args) => xpanel_reconcile::cli::run(*args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
