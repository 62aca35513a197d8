//! Music Organizer - moves freshly downloaded albums into a structured
//! library tree.
//!
//! A staging directory is scanned once at startup and then watched; every
//! album directory that appears is imported (tags read, records stored)
//! and moved to `<music_dir>/<label>/<year> <artist> - <title>`.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod organizer;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("music_organizer=info".parse()?))
        .init();

    cli::run(&args)
}
