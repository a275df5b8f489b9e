//! Admin CLI standalone binary.

use clap::Parser;
use xpanel_admin::{AdminArgs, cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AdminArgs::parse();
    cli::run(args).await
}
