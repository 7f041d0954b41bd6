//! Load error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a source onto a deck
///
/// A failed load never disturbs the source that is currently playing.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The reader binding could not produce a decoder for the location
    /// (missing file, permission error, unsupported or corrupt format)
    #[error("Unreadable audio source {location:?}: {reason}")]
    Unreadable { location: PathBuf, reason: String },

    /// The decoded source could not be handed to the audio thread
    #[error("Engine command queue is full, load dropped")]
    QueueFull,
}

impl LoadError {
    pub(crate) fn unreadable(location: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unreadable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;
