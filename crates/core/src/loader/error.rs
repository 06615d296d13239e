//! Error types for the loader module.

use thiserror::Error;

use super::state::LoaderState;

/// Lifecycle misuse of a loader. Always a programming error in the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    #[error("Cannot open a loader that has already been opened")]
    AlreadyOpened,

    #[error("Cannot open a loader that is already in the dumping state")]
    AlreadyDumping,

    #[error("Cannot reopen a loader that has already been closed")]
    ReopenAfterClose,

    #[error("Cannot dump to a loader that has not yet been opened")]
    DumpBeforeOpen,

    #[error("Cannot dump after the loader has been closed")]
    DumpAfterClose,

    #[error("Loader is already closed")]
    AlreadyClosed,
}

impl InvalidStateError {
    /// State the loader was in when the operation was rejected.
    pub fn state(&self) -> LoaderState {
        match self {
            InvalidStateError::AlreadyOpened => LoaderState::Opened,
            InvalidStateError::AlreadyDumping => LoaderState::Dumping,
            InvalidStateError::DumpBeforeOpen => LoaderState::Created,
            InvalidStateError::ReopenAfterClose
            | InvalidStateError::DumpAfterClose
            | InvalidStateError::AlreadyClosed => LoaderState::Closed,
        }
    }
}

/// Errors that can occur while driving a loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Lifecycle misuse.
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The item could not be encoded for this sink.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// The loader was used without its resource being available.
    #[error("Loader not ready: {0}")]
    NotReady(String),

    /// The loader configuration is invalid.
    #[error("Loader configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for LoaderError {
    fn from(err: rusqlite::Error) -> Self {
        LoaderError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinct_per_state() {
        let messages = [
            InvalidStateError::AlreadyOpened,
            InvalidStateError::AlreadyDumping,
            InvalidStateError::ReopenAfterClose,
        ]
        .map(|e| e.to_string());

        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_invalid_state_is_transparent() {
        let err: LoaderError = InvalidStateError::DumpAfterClose.into();
        assert_eq!(err.to_string(), "Cannot dump after the loader has been closed");
        assert_eq!(InvalidStateError::DumpAfterClose.state(), LoaderState::Closed);
    }
}
