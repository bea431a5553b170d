use std::ffi::c_int;

use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

/// A non-success status returned by the SQLite engine.
///
/// Carries the raw (possibly extended) result code together with the
/// diagnostic message the engine reported for the handle at the time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SQLite error {code}: {message}")]
pub struct EngineError {
    code: c_int,
    message: String,
}

impl EngineError {
    #[must_use]
    pub fn new(code: c_int, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Raw status code as returned by the engine.
    #[must_use]
    pub fn code(&self) -> c_int {
        self.code
    }

    /// Primary result code, with any extended bits masked off.
    #[must_use]
    pub fn primary_code(&self) -> c_int {
        self.code & 0xff
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classify the code using rusqlite's `ErrorCode`.
    #[must_use]
    pub fn kind(&self) -> ErrorCode {
        ffi::Error::new(self.code).code
    }

    /// True for `SQLITE_BUSY` and `SQLITE_LOCKED`.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.primary_code(), ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED)
    }
}

#[derive(Debug, Error)]
pub enum SqliteConnectionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Connection lane unavailable: {0}")]
    LaneUnavailable(String),

    #[error("Async task error: {0}")]
    Join(String),
}

impl SqliteConnectionError {
    /// The engine failure, if this error came from SQLite itself.
    #[must_use]
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            SqliteConnectionError::Engine(err) => Some(err),
            _ => None,
        }
    }
}
