//! Catalog proxy CLI - snapshot checks and cache administration.
//!
//! # Usage
//!
//! ```bash
//! # Drain WooCommerce once and report what a snapshot would contain
//! catalog-cli snapshot
//!
//! # Drop every cache entry on a running server
//! catalog-cli clear-cache --server http://localhost:3000
//!
//! # Force a full resync on a running server
//! catalog-cli resync --server http://localhost:3000
//! ```
//!
//! # Commands
//!
//! - `snapshot` - Build one snapshot and facet index against upstream
//! - `clear-cache` - Call the server's clear endpoint
//! - `resync` - Call the server's resync endpoint

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(author, version, about = "Catalog proxy CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot and facet index directly against WooCommerce
    Snapshot,
    /// Drop every cache entry on a running server
    ClearCache {
        /// Server base URL
        #[arg(short, long, env = "CATALOG_SERVER_URL", default_value = "http://127.0.0.1:3000")]
        server: Url,
    },
    /// Force a full snapshot rebuild on a running server
    Resync {
        /// Server base URL
        #[arg(short, long, env = "CATALOG_SERVER_URL", default_value = "http://127.0.0.1:3000")]
        server: Url,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Snapshot => commands::snapshot::run().await?,
        Commands::ClearCache { server } => commands::server::clear_cache(&server).await?,
        Commands::Resync { server } => commands::server::resync(&server).await?,
    }
    Ok(())
}
