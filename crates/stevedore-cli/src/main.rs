mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stevedore",
    about = "Deploy locally built store images as containers"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and start a container from a local image tag
    Deploy {
        /// Image tag carrying the marker, e.g. myapp:stores
        tag: String,
        /// Container name (default: <tag>_<uuid>)
        #[arg(long)]
        name: Option<String>,
    },
    /// Handle newline-delimited build-completion events
    Handle {
        /// Read events from this file instead of stdin
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },
    /// Discover marked images and print the resulting topology
    Discover {
        /// Print the resolved topology as JSON
        #[arg(long)]
        json: bool,
    },
    /// List local images carrying the marker tag
    Images,
    /// Check engine connectivity and configuration
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="unset or invalid RUST_LOG falls back to info"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy { tag, name } => commands::deploy(&tag, name.as_deref()).await?,
        Commands::Handle { file } => commands::handle(file.as_deref()).await?,
        Commands::Discover { json } => commands::discover(json).await?,
        Commands::Images => commands::images().await?,
        Commands::Doctor => commands::doctor().await?,
    }

    Ok(())
}
