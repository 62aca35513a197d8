//! Album import into the track database.
//!
//! This is the tagging-engine seam: given a staged album directory, read
//! the embedded tags of every audio file in it, derive the album-level
//! fields, and record album and track rows. The organizer then re-queries
//! those records and never reads tags itself.

use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::metadata::{self, TrackTags};
use crate::model::Album;
use crate::db;

/// Check if a path has an audio file extension
pub fn is_audio_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    matches!(ext.as_deref(), Some("mp3" | "flac" | "ogg" | "m4a" | "wav"))
}

/// Collect the audio files of an album directory, sorted for deterministic
/// import order. Albums may nest (disc subdirectories), so the walk is
/// recursive.
fn collect_audio_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_audio_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Album-level fields derived from a set of track tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumFields {
    pub title: Option<String>,
    pub albumartist: Option<String>,
    pub year: Option<i64>,
    pub label: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Derive album-level fields from per-track tags: first non-empty value
/// wins, first non-zero year wins.
pub fn derive_album_fields(tags: &[TrackTags]) -> AlbumFields {
    let mut fields = AlbumFields::default();
    for t in tags {
        if fields.title.is_none() {
            fields.title = non_empty(t.album.as_ref());
        }
        if fields.albumartist.is_none() {
            fields.albumartist = non_empty(t.album_artist.as_ref());
        }
        if fields.year.is_none() {
            fields.year = t.year.filter(|y| *y != 0).map(i64::from);
        }
        if fields.label.is_none() {
            fields.label = non_empty(t.label.as_ref());
        }
    }
    fields
}

/// Import one album directory into the track database.
///
/// Reads tags from every audio file under `dir`, records one album row and
/// one track row per file, and returns the number of tracks imported. A
/// directory with no readable audio files is an import error. With `quiet`
/// set, per-track events are logged at debug instead of info.
pub async fn import_album(pool: &SqlitePool, dir: &Path, quiet: bool) -> Result<usize> {
    let files = collect_audio_files(dir);
    if files.is_empty() {
        return Err(Error::import(format!(
            "no audio files in {}",
            dir.display()
        )));
    }

    // Read tags up front; files with unreadable tags are skipped, not fatal
    let mut tagged: Vec<(PathBuf, TrackTags)> = Vec::with_capacity(files.len());
    for path in files {
        match metadata::read(&path) {
            Ok(tags) => tagged.push((path, tags)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
            }
        }
    }
    if tagged.is_empty() {
        return Err(Error::import(format!(
            "no readable audio files in {}",
            dir.display()
        )));
    }

    let fields = derive_album_fields(
        &tagged.iter().map(|(_, t)| t.clone()).collect::<Vec<_>>(),
    );
    // Directory name stands in for a missing album tag
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown".to_string());
    let title = fields.title.unwrap_or(dir_name);

    let album_id = db::get_or_create_album(
        pool,
        &title,
        fields.albumartist.as_deref(),
        fields.year,
        fields.label.as_deref(),
    )
    .await?;

    for (path, tags) in &tagged {
        let track_title = tags
            .title
            .clone()
            .or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "Unknown".to_string());
        let path_str = path.to_string_lossy();
        db::insert_track(pool, tags, &track_title, &path_str, Some(album_id)).await?;
        if quiet {
            debug!(path = %path.display(), "Imported track");
        } else {
            info!(path = %path.display(), "Imported track");
        }
    }

    info!(
        album = %title,
        tracks = tagged.len(),
        "Imported album from {}",
        dir.display()
    );
    Ok(tagged.len())
}

/// Re-query the album imported from `dir`.
///
/// Primary lookup is by track-path prefix; if that comes up empty (the
/// records were stored under another path spelling), fall back to an album
/// titled like the directory. `None` means the import left nothing behind.
pub async fn find_imported(pool: &SqlitePool, dir: &Path) -> Result<Option<Album>> {
    let prefix = format!("{}{}", dir.display(), std::path::MAIN_SEPARATOR);
    if let Some(album) = db::find_album_by_track_prefix(pool, &prefix).await? {
        return Ok(Some(album));
    }

    let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned());
    match dir_name {
        Some(name) => Ok(db::find_album_by_title(pool, &name).await?),
        None => Ok(None),
    }
}
