use std::path::PathBuf;

use grounding_language::LanguageError;
use grounding_model::{FeatureError, LlmError};
use thiserror::Error;

/// Errors raised while configuring or running a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A feature could not be evaluated for a candidate.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// A factor could not be scored.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A grounded language variable could not be assembled.
    #[error(transparent)]
    Language(#[from] LanguageError),

    /// A configuration or dictionary file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// A configuration or dictionary document is not valid JSON.
    #[error("Malformed search document: {0}")]
    Json(#[from] serde_json::Error),

    /// The search configuration cannot drive a search.
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}

/// Result of a search operation.
pub type SearchResult<T> = Result<T, SearchError>;
