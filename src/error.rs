//! Centralized error types for smsgate.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All errors produced by the smsgate library.
#[derive(Error, Debug)]
pub enum GateError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required request field is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// An ordinal or queue entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The SIM requires a PIN that was not supplied, or the PIN was rejected.
    #[error("Security error: {0}")]
    Security(String),

    /// The modem store cannot be queried (driver not initialized).
    #[error("Message store unavailable: {0}")]
    StoreUnavailable(String),

    /// The text cannot be encoded into segments.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Failure reported by the modem driver, passed through untranslated.
    #[error("Modem error: {0}")]
    Driver(String),

    /// The modem gate could not be acquired within the configured wait.
    #[error("Modem busy: gate not acquired within {0:?}")]
    GateTimeout(Duration),

    /// The credentials file contains an unusable line.
    #[error("Invalid credentials file '{path}' line {line}")]
    InvalidCredentials { path: PathBuf, line: usize },
}

/// Convenience alias for `Result<T, GateError>`.
pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `GateError::io`).
impl From<std::io::Error> for GateError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
