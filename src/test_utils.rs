//! Test utilities and fixtures.
//!
//! Common helpers to reduce boilerplate in tests: a temporary track
//! database, staged album directories on disk, and record/tag mocks.

use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::metadata::TrackTags;
use crate::model::{Album, Track};

/// Creates a temporary database for testing.
///
/// The database lives in a temporary directory that is cleaned up when the
/// returned `TempDir` is dropped; keep it alive for the duration of the
/// test. Migrations run automatically.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates a staged album directory under `root` with the given relative
/// files (nested paths allowed), each holding placeholder bytes.
///
/// Returns the album directory path.
pub fn write_album_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(name);
    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create album subdirectory");
        }
        std::fs::write(&path, b"placeholder content").expect("Failed to write album file");
    }
    dir
}

/// Creates mock TrackTags with sensible defaults.
///
/// Customize with struct update syntax:
///
/// ```ignore
/// let tags = TrackTags { year: Some(1999), ..mock_tags() };
/// ```
pub fn mock_tags() -> TrackTags {
    TrackTags {
        title: Some("Test Track".to_string()),
        artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        album_artist: Some("Test Artist".to_string()),
        year: Some(2020),
        label: Some("Test Label".to_string()),
        track_number: Some(1),
        duration: 180,
    }
}

/// Creates an Album record without touching the database.
pub fn album_record(
    id: i64,
    title: &str,
    albumartist: Option<&str>,
    year: Option<i64>,
    label: Option<&str>,
) -> Album {
    Album {
        id,
        title: title.to_string(),
        albumartist: albumartist.map(String::from),
        year,
        label: label.map(String::from),
    }
}

/// Creates a Track record without touching the database.
pub fn track_record(id: i64, album_id: i64, title: &str, artist: Option<&str>, path: &str) -> Track {
    Track {
        id,
        album_id: Some(album_id),
        title: title.to_string(),
        artist: artist.map(String::from),
        path: path.to_string(),
        track_number: None,
        duration: None,
    }
}
