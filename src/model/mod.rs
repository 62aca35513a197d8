//! Core data models for imported albums.
//!
//! Defines the record types the importer writes and the placement resolver
//! consumes: [`Album`] and [`Track`]. Both are derived from SQLx for
//! database mapping.

use sqlx::FromRow;

/// An imported album.
#[derive(Debug, Clone, FromRow)]
pub struct Album {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Album title
    pub title: String,
    /// Album-level artist, when the tags carry one
    pub albumartist: Option<String>,
    /// Release year; tags commonly store 0 when unknown
    pub year: Option<i64>,
    /// Record label used as the top-level grouping directory
    pub label: Option<String>,
}

/// A track (audio file) belonging to an imported album.
#[derive(Debug, Clone, FromRow)]
pub struct Track {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Foreign key to albums table
    pub album_id: Option<i64>,
    /// Track title (from tags or filename)
    pub title: String,
    /// Track-level artist
    pub artist: Option<String>,
    /// Absolute file path, kept in sync with the filesystem after moves
    pub path: String,
    /// Track number on album
    pub track_number: Option<i64>,
    /// Duration in seconds
    pub duration: Option<i64>,
}
