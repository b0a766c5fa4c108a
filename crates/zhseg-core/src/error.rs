use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during zhseg operations.
#[derive(Debug, Error)]
pub enum SegError {
    /// Viterbi decoding was asked to decode a sentence with no positions.
    #[error("cannot decode an empty emission matrix")]
    EmptyEmissions,

    /// A tag path is illegal under the adjacency table or has the wrong length.
    #[error("invalid tag path: {0}")]
    InvalidPath(String),

    /// A windowed cache file is malformed.
    #[error("malformed cache file {file:?} at line {line}: {reason}")]
    CacheFormat {
        /// The offending file.
        file: PathBuf,
        /// 1-based line number (0 when the whole file is at fault).
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// No checkpoint exists at the given location.
    #[error("checkpoint not found at {0:?}")]
    CheckpointNotFound(PathBuf),

    /// Configuration values are invalid or disagree with persisted parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// Tensor backend error while reading or writing a checkpoint.
    #[error("tensor error: {0}")]
    Tensor(String),

    /// A JSON side file (vocabulary, model config) could not be read or written.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for SegError {
    fn from(err: candle_core::Error) -> Self {
        SegError::Tensor(err.to_string())
    }
}

/// Result type alias for zhseg operations.
pub type Result<T> = std::result::Result<T, SegError>;
