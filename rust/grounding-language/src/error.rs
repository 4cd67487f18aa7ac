use thiserror::Error;

/// Errors produced while building or decoding language inputs.
#[derive(Error, Debug)]
pub enum LanguageError {
    /// A document did not match the language variable or symbol schema.
    #[error("Malformed language document: {0}")]
    Json(#[from] serde_json::Error),

    /// Groundings were supplied for a different number of children than the
    /// language variable has.
    #[error("Expected groundings for {expected} children, got {found}")]
    ChildCount { expected: usize, found: usize },
}
