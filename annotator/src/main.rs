//! Annotator - command line front end for the text annotation engine
//!
//! Rebuilds a container from its markup on every run, replays the stored
//! annotations onto it, then applies the requested change.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    let output = commands::run(&cli)?;
    print!("{}", output);
    Ok(())
}
