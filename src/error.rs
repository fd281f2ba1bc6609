use std::path::PathBuf;

/// Errors produced while generating or playing back an ASCII frame sequence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid operator input
    #[error("usage error: {0}")]
    Usage(String),

    /// The source frame rate could not be determined
    #[error("could not determine frame rate of {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The media or image collaborator failed on a still
    #[error("decoding {path} failed: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("no still frames were decoded from {0}")]
    EmptySequence(PathBuf),

    /// Playback found missing or malformed frame storage
    #[error("frame storage error at {path}: {message}")]
    FrameStorage { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::FrameStorage {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;
