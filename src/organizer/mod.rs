//! Album placement and movement.
//!
//! Computes a sanitized, collision-free destination directory for an
//! imported album and relocates it, keeping the persisted track paths in
//! sync. Resulting layout:
//!
//! `<music_dir>/<label>/<year> <artist> - <title>[ (N)]/...`
//!
//! # Features
//! - Multi-artist consolidation ("VA" for three or more artists)
//! - Filename sanitation for filesystem-reserved characters
//! - Deterministic collision suffixing
//! - Dry-run mode to preview placements without moving anything

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::{Error, Result, ResultExt};
use crate::library;
use crate::model::{Album, Track};

/// Metadata driving placement of one album.
///
/// Assembled from the album row plus its track rows; read-only input to
/// the resolver.
#[derive(Debug, Clone)]
pub struct AlbumMetadata {
    /// Release year; `None` and `Some(0)` both mean "no year"
    pub year: Option<i64>,
    /// Album title
    pub title: String,
    /// Record label, if tagged
    pub label: Option<String>,
    /// Distinct contributing artists, first-seen order
    pub artists: Vec<String>,
}

impl AlbumMetadata {
    /// Collect placement metadata from an album and its tracks.
    ///
    /// The artist list is the album-level artist plus every track artist,
    /// excluding any literal "various artists", de-duplicated preserving
    /// first-seen order.
    pub fn from_records(album: &Album, tracks: &[Track]) -> Self {
        let mut artists = Vec::new();
        if let Some(albumartist) = &album.albumartist {
            push_artist(&mut artists, albumartist);
        }
        for track in tracks {
            if let Some(artist) = &track.artist {
                push_artist(&mut artists, artist);
            }
        }

        Self {
            year: album.year,
            title: album.title.clone(),
            label: album.label.clone(),
            artists,
        }
    }
}

fn push_artist(artists: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("various artists") {
        return;
    }
    if !artists.iter().any(|a| a == name) {
        artists.push(name.to_string());
    }
}

/// Format the artist segment of the folder name.
///
/// No artists yields "Unknown"; one or two are comma-joined; three or more
/// collapse to "VA".
pub fn artist_label(artists: &[String]) -> String {
    if artists.is_empty() {
        return "Unknown".to_string();
    }
    if artists.len() >= 3 {
        return "VA".to_string();
    }
    artists.join(", ")
}

/// Sanitize one path segment to be safe for all file systems.
///
/// Strips `\ / : * ? " < > |`, collapses whitespace runs to single spaces,
/// and trims. An empty result becomes "unknown".
pub fn sanitize_name(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();

    // split_whitespace both collapses runs and trims the ends
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "unknown".to_string()
    } else {
        collapsed
    }
}

/// The label directory segment: sanitized label, or "Unknown" when the
/// album carries none.
fn label_segment(label: Option<&str>) -> String {
    match label {
        Some(l) if !l.trim().is_empty() => sanitize_name(l),
        _ => "Unknown".to_string(),
    }
}

/// Build the album folder name. The year segment is present iff the year
/// is known and non-zero.
pub fn folder_name(meta: &AlbumMetadata) -> String {
    let artist = sanitize_name(&artist_label(&meta.artists));
    let title = sanitize_name(&meta.title);

    match meta.year.filter(|y| *y != 0) {
        Some(year) => format!("{year} {artist} - {title}"),
        None => format!("{artist} - {title}"),
    }
}

/// A resolved destination for one album.
///
/// Computed fresh per album and consumed immediately by the mover; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Destination directory the album's files move into
    pub directory: PathBuf,
    /// Whether a collision suffix was appended to avoid an existing sibling
    pub collision_adjusted: bool,
}

/// Resolve the collision-free destination directory for an album.
///
/// The target is `<music_dir>/<label>/<folder-name>`; if that path already
/// exists, ` (N)` is appended with N counting up from 1 until an unused
/// sibling is found. The search is sequential, so the outcome is
/// deterministic for a fixed set of pre-existing siblings.
pub fn resolve_destination(music_dir: &Path, meta: &AlbumMetadata) -> Placement {
    let parent = music_dir.join(label_segment(meta.label.as_deref()));
    let name = folder_name(meta);

    let mut directory = parent.join(&name);
    let mut collision_adjusted = false;
    let mut n = 1u32;
    while directory.exists() {
        collision_adjusted = true;
        directory = parent.join(format!("{name} ({n})"));
        n += 1;
    }

    Placement {
        directory,
        collision_adjusted,
    }
}

/// Move an album directory to its destination, preserving the relative
/// layout of its contents.
pub fn move_album(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    // Rename first; fall back to copy + delete across filesystems
    if fs::rename(source, dest).is_err() {
        copy_tree(source, dest)?;
        fs::remove_dir_all(source)?;
    }

    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| Error::placement(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::placement(e.to_string()))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Organize one imported album: resolve its destination, move the staged
/// directory there, and update every persisted track path to the new
/// location with the same relative suffix.
///
/// With `dry_run` set, the resolved placement is logged and returned but
/// nothing is moved or updated.
pub async fn organize_album(
    pool: &SqlitePool,
    album: &Album,
    source_dir: &Path,
    music_dir: &Path,
    dry_run: bool,
) -> Result<Placement> {
    let tracks = db::get_album_tracks(pool, album.id).await?;
    if tracks.is_empty() {
        return Err(Error::placement(format!(
            "album '{}' has no tracks",
            album.title
        )));
    }

    let meta = AlbumMetadata::from_records(album, &tracks);
    if meta.artists.len() >= 3 {
        info!(
            artists = meta.artists.len(),
            "Album has {} artists, using 'VA' as artist name",
            meta.artists.len()
        );
    } else {
        info!(
            artists = meta.artists.len(),
            "Album artists: {}",
            meta.artists.join(", ")
        );
    }

    let placement = resolve_destination(music_dir, &meta);
    if placement.collision_adjusted {
        info!(
            target = %placement.directory.display(),
            "Destination already existed, using alternative path"
        );
    }

    if dry_run {
        info!(
            source = %source_dir.display(),
            target = %placement.directory.display(),
            "Would move album (dry run)"
        );
        return Ok(placement);
    }

    info!(
        source = %source_dir.display(),
        target = %placement.directory.display(),
        "Moving album"
    );
    move_album(source_dir, &placement.directory).with_context("moving album files")?;

    // Update persisted locations, preserving each track's relative suffix
    let mut updates = Vec::with_capacity(tracks.len());
    for track in &tracks {
        let rel = Path::new(&track.path)
            .strip_prefix(source_dir)
            .map_err(|e| Error::placement(e.to_string()))?;
        let new_path = placement.directory.join(rel);
        updates.push((track.id, new_path.to_string_lossy().into_owned()));
    }
    db::batch_update_track_paths(pool, &updates).await?;

    info!(album = %album.title, "Album organized successfully");
    Ok(placement)
}

/// Import and organize one staged album directory.
///
/// Every failure is caught here, logged, and scoped to this album; the
/// return value only says whether the album made it into the library.
pub async fn process_album(
    pool: &SqlitePool,
    dir: &Path,
    music_dir: &Path,
    dry_run: bool,
) -> bool {
    match try_process(pool, dir, music_dir, dry_run).await {
        Ok(placement) => {
            info!(
                source = %dir.display(),
                target = %placement.directory.display(),
                "Processed album"
            );
            true
        }
        Err(e) => {
            warn!(source = %dir.display(), error = %e, "Skipping album");
            false
        }
    }
}

async fn try_process(
    pool: &SqlitePool,
    dir: &Path,
    music_dir: &Path,
    dry_run: bool,
) -> Result<Placement> {
    library::import_album(pool, dir, true)
        .await
        .with_context("importing album")?;

    let album = library::find_imported(pool, dir)
        .await?
        .ok_or_else(|| Error::AlbumNotFound(dir.to_path_buf()))?;

    organize_album(pool, &album, dir, music_dir, dry_run).await
}

/// Process every album directory already sitting in the staging directory.
///
/// Runs fully, in name order, before monitoring begins. Returns the set of
/// processed paths that seeds the monitor's duplicate suppression.
pub async fn process_existing(
    pool: &SqlitePool,
    unsorted_dir: &Path,
    music_dir: &Path,
    dry_run: bool,
) -> Result<HashSet<PathBuf>> {
    let mut processed = HashSet::new();

    let mut dirs: Vec<PathBuf> = fs::read_dir(unsorted_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    dirs.sort();

    if dirs.is_empty() {
        info!("No existing albums found in {}", unsorted_dir.display());
        return Ok(processed);
    }

    info!(count = dirs.len(), "Processing existing albums");
    for dir in dirs {
        processed.insert(dir.clone());
        process_album(pool, &dir, music_dir, dry_run).await;
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{album_record, temp_db, track_record, write_album_dir};
    use tempfile::tempdir;

    fn meta(year: Option<i64>, title: &str, label: Option<&str>, artists: &[&str]) -> AlbumMetadata {
        AlbumMetadata {
            year,
            title: title.to_string(),
            label: label.map(String::from),
            artists: artists.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_artist_label_counts() {
        assert_eq!(artist_label(&[]), "Unknown");
        assert_eq!(artist_label(&["Solo Artist".to_string()]), "Solo Artist");
        assert_eq!(
            artist_label(&["A".to_string(), "B".to_string()]),
            "A, B"
        );
        let four: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(artist_label(&four), "VA");
    }

    #[test]
    fn test_from_records_dedupes_and_skips_various_artists() {
        let album = album_record(1, "Comp", Some("Various Artists"), Some(2021), None);
        let tracks = vec![
            track_record(1, 1, "One", Some("X"), "/staging/comp/01.mp3"),
            track_record(2, 1, "Two", Some("X"), "/staging/comp/02.mp3"),
            track_record(3, 1, "Three", Some("Y"), "/staging/comp/03.mp3"),
            track_record(4, 1, "Four", Some("various artists"), "/staging/comp/04.mp3"),
        ];

        let meta = AlbumMetadata::from_records(&album, &tracks);
        assert_eq!(meta.artists, vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn test_sanitize_name_strips_reserved_characters() {
        assert_eq!(sanitize_name("AC/DC"), "ACDC");
        assert_eq!(sanitize_name("Track: Title?"), "Track Title");
        assert_eq!(sanitize_name("a<b>c|d"), "abcd");
        assert_eq!(sanitize_name("Valid Name"), "Valid Name");
    }

    #[test]
    fn test_sanitize_name_collapses_whitespace() {
        assert_eq!(sanitize_name("  too   many    spaces  "), "too many spaces");
    }

    #[test]
    fn test_sanitize_name_never_empty() {
        assert_eq!(sanitize_name(""), "unknown");
        assert_eq!(sanitize_name("???"), "unknown");
        assert_eq!(sanitize_name("   "), "unknown");
    }

    #[test]
    fn test_folder_name_year_iff_present_and_non_zero() {
        let with_year = meta(Some(2020), "Demo", None, &["X"]);
        assert_eq!(folder_name(&with_year), "2020 X - Demo");

        let no_year = meta(None, "Demo", None, &["X"]);
        assert_eq!(folder_name(&no_year), "X - Demo");

        let zero_year = meta(Some(0), "Demo", None, &["X"]);
        assert_eq!(folder_name(&zero_year), "X - Demo");
    }

    #[test]
    fn test_label_segment_fallbacks() {
        assert_eq!(label_segment(None), "Unknown");
        assert_eq!(label_segment(Some("")), "Unknown");
        assert_eq!(label_segment(Some("   ")), "Unknown");
        assert_eq!(label_segment(Some("Lbl")), "Lbl");
        assert_eq!(label_segment(Some("???")), "unknown");
    }

    #[test]
    fn test_resolve_destination_unknown_label() {
        let music = tempdir().unwrap();
        let m = meta(Some(2020), "Demo", None, &["X"]);

        let placement = resolve_destination(music.path(), &m);
        assert_eq!(
            placement.directory,
            music.path().join("Unknown").join("2020 X - Demo")
        );
        assert!(!placement.collision_adjusted);
    }

    #[test]
    fn test_resolve_destination_collision_suffixes() {
        let music = tempdir().unwrap();
        let m = meta(Some(2020), "Demo", Some("Lbl"), &["X"]);

        let parent = music.path().join("Lbl");
        fs::create_dir_all(parent.join("2020 X - Demo")).unwrap();

        let placement = resolve_destination(music.path(), &m);
        assert_eq!(placement.directory, parent.join("2020 X - Demo (1)"));
        assert!(placement.collision_adjusted);

        fs::create_dir_all(parent.join("2020 X - Demo (1)")).unwrap();
        let placement = resolve_destination(music.path(), &m);
        assert_eq!(placement.directory, parent.join("2020 X - Demo (2)"));
    }

    #[test]
    fn test_move_album_preserves_relative_layout() {
        let temp = tempdir().unwrap();
        let source = write_album_dir(
            temp.path(),
            "Demo",
            &["01.mp3", "cd2/05.mp3", "cover.jpg"],
        );
        let dest = temp.path().join("library").join("Demo");

        move_album(&source, &dest).unwrap();

        assert!(!source.exists());
        assert!(dest.join("01.mp3").exists());
        assert!(dest.join("cd2").join("05.mp3").exists());
        assert!(dest.join("cover.jpg").exists());
    }

    #[tokio::test]
    async fn test_organize_album_moves_and_updates_paths() {
        let (pool, _db_dir) = temp_db().await;
        let temp = tempdir().unwrap();
        let source = write_album_dir(temp.path(), "staging/Demo", &["01.mp3", "02.mp3"]);
        let music = temp.path().join("music");

        let album_id = db::get_or_create_album(&pool, "Demo", Some("X"), Some(2020), Some("Lbl"))
            .await
            .unwrap();
        let tags = crate::metadata::TrackTags {
            artist: Some("X".to_string()),
            ..crate::test_utils::mock_tags()
        };
        for file in ["01.mp3", "02.mp3"] {
            let path = source.join(file);
            db::insert_track(&pool, &tags, file, &path.to_string_lossy(), Some(album_id))
                .await
                .unwrap();
        }
        let album = db::get_album_by_id(&pool, album_id).await.unwrap().unwrap();

        let placement = organize_album(&pool, &album, &source, &music, false)
            .await
            .unwrap();

        let expected = music.join("Lbl").join("2020 X - Demo");
        assert_eq!(placement.directory, expected);
        assert!(!source.exists());
        assert!(expected.join("01.mp3").exists());
        assert!(expected.join("02.mp3").exists());

        // Persisted paths follow the move with the same relative suffix
        let tracks = db::get_album_tracks(&pool, album_id).await.unwrap();
        for track in tracks {
            assert!(
                track.path.starts_with(&expected.to_string_lossy().into_owned()),
                "path {} not under {}",
                track.path,
                expected.display()
            );
        }
    }

    #[tokio::test]
    async fn test_organize_album_dry_run_touches_nothing() {
        let (pool, _db_dir) = temp_db().await;
        let temp = tempdir().unwrap();
        let source = write_album_dir(temp.path(), "staging/Demo", &["01.mp3"]);
        let music = temp.path().join("music");

        let album_id = db::get_or_create_album(&pool, "Demo", Some("X"), Some(2020), None)
            .await
            .unwrap();
        let tags = crate::metadata::TrackTags {
            artist: Some("X".to_string()),
            ..crate::test_utils::mock_tags()
        };
        let track_path = source.join("01.mp3");
        db::insert_track(
            &pool,
            &tags,
            "01.mp3",
            &track_path.to_string_lossy(),
            Some(album_id),
        )
        .await
        .unwrap();
        let album = db::get_album_by_id(&pool, album_id).await.unwrap().unwrap();

        let placement = organize_album(&pool, &album, &source, &music, true)
            .await
            .unwrap();

        assert_eq!(
            placement.directory,
            music.join("Unknown").join("2020 X - Demo")
        );
        assert!(source.join("01.mp3").exists());
        assert!(!placement.directory.exists());

        let tracks = db::get_album_tracks(&pool, album_id).await.unwrap();
        assert_eq!(tracks[0].path, track_path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_process_existing_empty_staging() {
        let (pool, _db_dir) = temp_db().await;
        let staging = tempdir().unwrap();
        let music = tempdir().unwrap();

        let processed = process_existing(&pool, staging.path(), music.path(), false)
            .await
            .unwrap();
        assert!(processed.is_empty());
    }

    #[tokio::test]
    async fn test_process_existing_skips_bad_album_and_continues() {
        let (pool, _db_dir) = temp_db().await;
        let staging = tempdir().unwrap();
        let music = tempdir().unwrap();

        // A directory with no audio files fails import but is still marked
        // processed, and the run carries on
        let junk = staging.path().join("not-an-album");
        fs::create_dir_all(&junk).unwrap();
        fs::write(junk.join("readme.txt"), b"nothing here").unwrap();

        let processed = process_existing(&pool, staging.path(), music.path(), false)
            .await
            .unwrap();
        assert!(processed.contains(&junk));
        assert!(junk.exists());
    }
}
