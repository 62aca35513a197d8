//! Command-line interface and run loop.
//!
//! Resolves the effective directories (flags override config, config
//! overrides platform defaults), ensures they exist, runs the batch pass
//! over albums already sitting in the staging directory, then monitors for
//! new ones until interrupted.

use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::{config, db, organizer, scanner};

/// Automatically organize music albums into a label/year-structured library
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to monitor for new albums (default: <music-dir>/_unsorted)
    #[arg(long, env = "MUSIC_ORGANIZER_UNSORTED_DIR")]
    pub unsorted_dir: Option<PathBuf>,

    /// Base directory for organized music (default: the user music directory)
    #[arg(long, env = "MUSIC_ORGANIZER_MUSIC_DIR")]
    pub music_dir: Option<PathBuf>,

    /// Track database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Resolve and log placements without moving files or updating records
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the organizer: batch pass, then monitoring until Ctrl+C.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    rt.block_on(run_inner(cli))
}

async fn run_inner(cli: &Cli) -> anyhow::Result<()> {
    let config = config::load();

    // Leave an editable config behind on first run
    if config::config_path().is_some_and(|p| !p.exists())
        && let Err(e) = config::save(&config)
    {
        warn!(error = %e, "Could not write default config file");
    }

    let music_dir = cli
        .music_dir
        .clone()
        .or_else(|| config.library.music_dir.clone())
        .unwrap_or_else(default_music_dir);
    let unsorted_dir = cli
        .unsorted_dir
        .clone()
        .or_else(|| config.library.unsorted_dir.clone())
        .unwrap_or_else(|| music_dir.join("_unsorted"));

    // Missing directories are created, not fatal
    if !unsorted_dir.exists() {
        info!("Creating unsorted directory: {}", unsorted_dir.display());
        std::fs::create_dir_all(&unsorted_dir)?;
    }
    if !music_dir.exists() {
        info!("Creating music directory: {}", music_dir.display());
        std::fs::create_dir_all(&music_dir)?;
    }

    let db_path = cli.db.clone().or_else(|| config.library.database.clone());
    let pool = db::init_db(&db::db_url(db_path.as_deref())).await?;

    // Always process existing albums first
    info!("Processing existing albums in {}", unsorted_dir.display());
    let processed: HashSet<PathBuf> =
        organizer::process_existing(&pool, &unsorted_dir, &music_dir, cli.dry_run).await?;

    // An interrupt during monitoring is a normal, successful exit
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current album");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let opts = scanner::MonitorOptions {
        settle_delay: Duration::from_secs(config.monitor.settle_delay_secs),
        dry_run: cli.dry_run,
    };
    let processed =
        scanner::monitor(&pool, &unsorted_dir, &music_dir, processed, opts, shutdown).await?;
    info!(albums = processed.len(), "Run complete");

    Ok(())
}

/// The platform music directory, falling back to ~/Music.
fn default_music_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("Music"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["music-organizer"]);
        assert!(cli.unsorted_dir.is_none());
        assert!(cli.music_dir.is_none());
        assert!(cli.db.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "music-organizer",
            "--unsorted-dir",
            "/staging",
            "--music-dir",
            "/music",
            "--db",
            "/data/tracks.db",
            "--dry-run",
        ]);
        assert_eq!(cli.unsorted_dir, Some(PathBuf::from("/staging")));
        assert_eq!(cli.music_dir, Some(PathBuf::from("/music")));
        assert_eq!(cli.db, Some(PathBuf::from("/data/tracks.db")));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_default_music_dir_is_not_empty() {
        assert!(!default_music_dir().as_os_str().is_empty());
    }
}
