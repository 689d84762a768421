//! KVS CLI - command-line access to the KVS key-value service.
//!
//! Every command opens one session, fans its arguments out concurrently
//! and prints one line per argument.
//!
//! # Usage
//!
//! ```bash
//! export KVS_SERVICE_URL="http://localhost:8080"
//! kvs-cli int-put a:1 b:2
//! kvs-cli int-get a b missing
//! kvs-cli map-put profile name=Jacob role=tester
//! kvs-cli fibo 10 20 45
//! ```

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// Initialize tracing subscriber with environment-based filtering.
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.is_quiet, cli.global.is_verbose);

    cli.run().await
}
