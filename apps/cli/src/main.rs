//! CreatorLens CLI: classify social-media creators and merge in their
//! earnings.
//!
//! Fetches each creator's popular casts, asks a generative model for a
//! category, and writes one enriched JSON dataset for reporting.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
