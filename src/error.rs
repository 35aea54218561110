// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while estimating abundances.
///
/// `ExternalToolFailure` is scoped to one sample: the multi-sample driver
/// logs it and moves on. The other variants abort the current query.
#[derive(Debug, Error)]
pub enum FocusError {
    /// Malformed or empty count/profile/alignment data.
    #[error("invalid input ({context}): {message}")]
    InvalidInput { context: String, message: String },

    /// The non-negative least-squares solve did not produce a usable answer.
    #[error("solver failure: {0}")]
    SolverFailure(String),

    /// A counter or aligner exited non-zero or left no output behind.
    #[error("{tool} failed on sample {sample}: {message}")]
    ExternalToolFailure {
        tool: String,
        sample: String,
        message: String,
    },

    /// Invalid thresholds, unknown aligner, missing reference files.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FocusError {
    pub fn invalid_input(context: impl Into<String>, message: impl Into<String>) -> Self {
        FocusError::InvalidInput {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FocusError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
