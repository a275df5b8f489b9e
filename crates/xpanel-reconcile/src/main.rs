//! Reconciler standalone binary.

use clap::Parser;
use xpanel_reconcile::{ReconcileArgs, cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ReconcileArgs::parse();
    cli::run(args).await
}
