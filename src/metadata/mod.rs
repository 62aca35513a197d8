//! Audio file tag reading.
//!
//! Uses the lofty crate for format-independent metadata access. Reads the
//! fields placement cares about (album, artists, year, label) from MP3,
//! FLAC, OGG, M4A, and WAV files.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use std::path::Path;

use crate::error::{Error, Result};

/// Embedded tags of one audio file.
///
/// Every field except duration is optional: placement decides fallbacks,
/// not the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub label: Option<String>,
    pub track_number: Option<u32>,
    /// Duration in seconds
    pub duration: u64,
}

/// Read the embedded tags of a single audio file.
pub fn read(path: &Path) -> Result<TrackTags> {
    // Probe the file to determine format and read tags
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::tags(path, e.to_string()))?
        .read()
        .map_err(|e| Error::tags(path, e.to_string()))?;

    // Get the primary tag, or fall back to the first available tag
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let title = tag.and_then(|t| t.title().map(|s| s.to_string()));
    let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
    let album = tag.and_then(|t| t.album().map(|s| s.to_string()));
    let album_artist = tag
        .and_then(|t| t.get_string(&ItemKey::AlbumArtist))
        .map(|s| s.to_string());
    let label = tag
        .and_then(|t| t.get_string(&ItemKey::Label))
        .map(|s| s.to_string());
    let year = tag.and_then(|t| t.year());
    let track_number = tag.and_then(|t| t.track());

    // Duration comes from the stream properties, not the tag
    let duration = tagged_file.properties().duration().as_secs();

    Ok(TrackTags {
        title,
        artist,
        album,
        album_artist,
        year,
        label,
        track_number,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_rejects_non_audio_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not an audio file").unwrap();

        let result = read(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_rejects_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.flac");
        assert!(read(&path).is_err());
    }
}
