//! Error types for repojudge core.

use std::{error::Error, fmt, io};

/// Error type for repojudge core operations.
#[derive(Debug)]
pub enum JudgeError {
    /// An underlying I/O error.
    Io(io::Error),
    /// The repository could not be cloned into a workspace.
    Clone(String),
    /// Invalid or missing configuration.
    Config(String),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for JudgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Clone(message) => write!(f, "clone failed: {message}"),
            Self::Config(message) => write!(f, "configuration error: {message}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for JudgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for JudgeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Convenience result type for repojudge core.
pub type Result<T> = std::result::Result<T, JudgeError>;
