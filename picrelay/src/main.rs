use anyhow::Result;
use clap::Parser;
use picrelay::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing for the binary.
    tracing_subscriber::fmt::init();
    tracing::info!("picrelay startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("picrelay exited cleanly"),
        Err(e) => tracing::error!(error = %e, "picrelay exited with error"),
    }
    result
}
