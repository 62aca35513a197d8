//! Database module for album and track persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Holds the records the importer produces and exposes the per-track
//! persisted-path update the organizer runs after every album move.

use crate::metadata::TrackTags;
use crate::model::{Album, Track};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "music_organizer.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Get or create an album by title and album artist.
///
/// Looks up an album by exact title and album-artist match. If not found,
/// creates a new record with the given year and label. Idempotent - calling
/// with the same title/artist pair always returns the same ID.
pub async fn get_or_create_album(
    pool: &SqlitePool,
    title: &str,
    albumartist: Option<&str>,
    year: Option<i64>,
    label: Option<&str>,
) -> sqlx::Result<i64> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM albums WHERE title = ? AND albumartist IS ?")
            .bind(title)
            .bind(albumartist)
            .fetch_optional(pool)
            .await?;

    if let Some((id,)) = row {
        Ok(id)
    } else {
        let result = sqlx::query("INSERT INTO albums (title, albumartist, year, label) VALUES (?, ?, ?, ?)")
            .bind(title)
            .bind(albumartist)
            .bind(year)
            .bind(label)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

/// Insert or update a track record.
///
/// Uses SQLite's UPSERT to either insert a new track or update an existing
/// one based on the file path, so re-importing a directory never duplicates
/// rows.
pub async fn insert_track(
    pool: &SqlitePool,
    tags: &TrackTags,
    title: &str,
    path: &str,
    album_id: Option<i64>,
) -> sqlx::Result<i64> {
    let track_number = tags.track_number.map(|n| n as i64);
    let duration = tags.duration as i64;

    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO tracks (album_id, title, artist, path, track_number, duration)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            album_id = excluded.album_id,
            title = excluded.title,
            artist = excluded.artist,
            track_number = excluded.track_number,
            duration = excluded.duration
        RETURNING id
        "#,
    )
    .bind(album_id)
    .bind(title)
    .bind(&tags.artist)
    .bind(path)
    .bind(track_number)
    .bind(duration)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Get an album by its database ID.
pub async fn get_album_by_id(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Option<Album>> {
    sqlx::query_as::<_, Album>("SELECT id, title, albumartist, year, label FROM albums WHERE id = ?")
        .bind(album_id)
        .fetch_optional(pool)
        .await
}

/// Find the album owning a track whose path starts with the given prefix.
///
/// This is the primary post-import lookup: every imported track path starts
/// with the staged album directory.
pub async fn find_album_by_track_prefix(
    pool: &SqlitePool,
    prefix: &str,
) -> sqlx::Result<Option<Album>> {
    sqlx::query_as::<_, Album>(
        r#"
        SELECT DISTINCT a.id, a.title, a.albumartist, a.year, a.label
        FROM albums a
        JOIN tracks t ON t.album_id = a.id
        WHERE t.path LIKE ? || '%'
        LIMIT 1
        "#,
    )
    .bind(prefix)
    .fetch_optional(pool)
    .await
}

/// Find an album by exact title.
///
/// Fallback lookup when the path-prefix query comes up empty.
pub async fn find_album_by_title(pool: &SqlitePool, title: &str) -> sqlx::Result<Option<Album>> {
    sqlx::query_as::<_, Album>(
        "SELECT id, title, albumartist, year, label FROM albums WHERE title = ? LIMIT 1",
    )
    .bind(title)
    .fetch_optional(pool)
    .await
}

/// Get all tracks belonging to an album, ordered by path.
pub async fn get_album_tracks(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<Track>> {
    sqlx::query_as::<_, Track>(
        r#"
        SELECT id, album_id, title, artist, path, track_number, duration
        FROM tracks
        WHERE album_id = ?
        ORDER BY path
        "#,
    )
    .bind(album_id)
    .fetch_all(pool)
    .await
}

/// Update the persisted file paths of an album's tracks in a single
/// transaction, after a move.
/// Returns the number of successfully updated tracks.
pub async fn batch_update_track_paths(
    pool: &SqlitePool,
    updates: &[(i64, String)],
) -> sqlx::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut success_count = 0;

    for (track_id, new_path) in updates {
        let result = sqlx::query("UPDATE tracks SET path = ? WHERE id = ?")
            .bind(new_path)
            .bind(track_id)
            .execute(&mut *tx)
            .await;

        if result.is_ok() {
            success_count += 1;
        }
    }

    tx.commit().await?;
    Ok(success_count)
}
