/// # picrelay CLI Interface (Module)
///
/// Command parsing and the async entrypoint. All pipeline logic lives in
/// the `picrelay-core` crate; this module is strictly CLI glue.
///
/// For programmatic/integration use, call [`run`] with a constructed
/// [`Cli`].
use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::load_config::load_config;
use crate::server;

/// CLI for picrelay: convert chat-attached images on request.
#[derive(Parser)]
#[clap(
    name = "picrelay",
    version,
    about = "Message-triggered image conversion relay for Slack"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the events server and handle conversion triggers
    Serve {
        /// Listen port; overrides PORT from the environment
        #[clap(long)]
        port: Option<u16>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { port } => {
            let mut config = load_config()?;
            if let Some(port) = port {
                config.port = port;
            }
            tracing::info!(command = "serve", port = config.port, "starting events server");
            server::serve(config).await
        }
    }
}
