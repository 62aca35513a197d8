//! Application-wide error types.
//!
//! Library modules use the crate [`Error`] via `thiserror`, while the CLI
//! and `main` use `anyhow` for convenient propagation. Every failure below
//! the CLI boundary is scoped to a single album: callers log it and move on
//! to the next album rather than aborting the run.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tag reading error
    #[error("Tag error for {path}: {message}")]
    Tags { path: PathBuf, message: String },

    /// Album import error
    #[error("Import error: {0}")]
    Import(String),

    /// Album placement or move error
    #[error("Placement error: {0}")]
    Placement(String),

    /// An imported album could not be found again in the track database
    #[error("No imported album found for {0}")]
    AlbumNotFound(PathBuf),

    /// Directory watcher error
    #[error("Watch error: {0}")]
    Watch(#[from] crate::scanner::WatchError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a tag reading error.
    pub fn tags(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Tags {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }

    /// Create a placement error.
    pub fn placement(message: impl Into<String>) -> Self {
        Self::Placement(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
