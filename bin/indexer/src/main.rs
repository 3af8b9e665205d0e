//! The unitscan indexer.

use clap::Parser;

mod cli;
mod flags;
mod telemetry;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
