//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-organizer\config.toml
//! - macOS: ~/Library/Application Support/music-organizer/config.toml
//! - Linux: ~/.config/music-organizer/config.toml
//!
//! The config file is human-readable and editable. CLI flags override
//! anything set here; missing or unparseable files fall back to defaults
//! and never abort startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library locations and the track database
    pub library: LibraryConfig,

    /// Monitoring behavior
    pub monitor: MonitorConfig,
}

/// Library locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Track database path (default: music_organizer.db in the working directory)
    pub database: Option<PathBuf>,

    /// Staging directory watched for new albums (default: <music_dir>/_unsorted)
    pub unsorted_dir: Option<PathBuf>,

    /// Library root the organized tree is built under (default: user music directory)
    pub music_dir: Option<PathBuf>,
}

/// Monitoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds to wait after a directory appears before treating it as
    /// fully copied
    pub settle_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: 5,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-organizer"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    // Ensure directory exists
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[library]"));
        assert!(toml.contains("[monitor]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.library.database = Some(PathBuf::from("/data/tracks.db"));
        config.library.unsorted_dir = Some(PathBuf::from("/music/_unsorted"));
        config.monitor.settle_delay_secs = 10;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.library.database, Some(PathBuf::from("/data/tracks.db")));
        assert_eq!(
            parsed.library.unsorted_dir,
            Some(PathBuf::from("/music/_unsorted"))
        );
        assert_eq!(parsed.monitor.settle_delay_secs, 10);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[library]
music_dir = "/srv/music"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified field is set
        assert_eq!(config.library.music_dir, Some(PathBuf::from("/srv/music")));

        // Other fields use defaults
        assert!(config.library.database.is_none());
        assert_eq!(config.monitor.settle_delay_secs, 5);
    }
}
