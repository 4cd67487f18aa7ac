use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or querying a world.
#[derive(Error, Debug)]
pub enum WorldError {
    /// The world document could not be read from disk.
    #[error("Failed to read world file {path:?}: {source}")]
    Io {
        /// Path of the document that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The world document is not valid JSON for the world schema.
    #[error("Malformed world document: {0}")]
    Json(#[from] serde_json::Error),

    /// A sort key name did not match any supported [`crate::SortKey`].
    #[error("Unknown sort key \"{0}\"")]
    UnknownSortKey(String),
}
