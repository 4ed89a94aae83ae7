//! Binary crate for the `reach` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Writing GeoJSON and human-friendly summaries

use clap::Parser;

mod cli;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cmd = cli::Cli::parse();
    cmd.run().await
}
