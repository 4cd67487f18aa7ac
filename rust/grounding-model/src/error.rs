//! Error types for model loading, feature evaluation and scoring

use std::path::PathBuf;

use thiserror::Error;

use crate::FeatureId;

/// Errors raised while reading or writing a model document.
///
/// These are configuration errors: they are fatal to the current load and
/// never raised during inference.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The model file could not be read or written.
    #[error("Failed to access model file {path:?}: {source}")]
    Io {
        /// Path of the model document.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The model path has an extension other than `.xml` or `.json`.
    #[error("Unsupported model format for {0:?}; expected .xml or .json")]
    UnsupportedFormat(PathBuf),

    /// The XML reader or writer failed.
    #[error("XML error: {0}")]
    Xml(String),

    /// The JSON document did not match the model schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required element was not present.
    #[error("Missing required element <{0}>")]
    MissingElement(&'static str),

    /// An element appeared somewhere it is not allowed.
    #[error("Unexpected element <{element}> {context}")]
    UnexpectedElement {
        /// Name of the offending element.
        element: String,
        /// Where the element was found.
        context: &'static str,
    },

    /// A feature's `class` attribute named no known feature type.
    #[error("Unknown feature class \"{0}\"")]
    UnknownFeatureClass(String),

    /// A feature type was asked to parse attributes of another class.
    #[error("Expected feature class \"{expected}\", found \"{found}\"")]
    ClassMismatch {
        /// The class the parser handles.
        expected: &'static str,
        /// The class named by the attributes.
        found: String,
    },

    /// A feature lacked one of its required attributes.
    #[error("Feature \"{class}\" is missing required attribute \"{attribute}\"")]
    MissingAttribute {
        /// Feature class being parsed.
        class: String,
        /// Name of the absent attribute.
        attribute: String,
    },

    /// A feature attribute could not be interpreted.
    #[error("Feature \"{class}\" has invalid {attribute}=\"{value}\": {reason}")]
    InvalidAttribute {
        /// Feature class being parsed.
        class: String,
        /// Name of the attribute.
        attribute: String,
        /// The rejected value.
        value: String,
        /// What was expected instead.
        reason: String,
    },

    /// One entry of the comma-separated weights list is not a number.
    #[error("Invalid weight \"{value}\" at position {position}")]
    InvalidWeight {
        /// Zero-based position in the list.
        position: usize,
        /// The rejected entry.
        value: String,
    },

    /// The weights do not fit the feature pool.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Errors raised by a feature while it evaluates.
///
/// Missing optional data is not an error; features resolve it to `False`.
/// These variants are reserved for structurally malformed inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// A symbol the feature relies on lacks a structural property.
    #[error("Feature \"{class}\" requires property \"{property}\" on symbol {symbol}")]
    MissingProperty {
        /// Class of the evaluating feature.
        class: &'static str,
        /// The absent property.
        property: &'static str,
        /// Key of the offending symbol.
        symbol: String,
    },

    /// A structural property is present but cannot be interpreted.
    #[error("Feature \"{class}\" cannot interpret {property}=\"{value}\" on symbol {symbol}")]
    MalformedProperty {
        /// Class of the evaluating feature.
        class: &'static str,
        /// The property that failed to parse.
        property: &'static str,
        /// Its value.
        value: String,
        /// Key of the offending symbol.
        symbol: String,
    },

    /// A handle does not name a live feature instance of the pool.
    #[error("Feature handle {0:?} does not refer to a live feature instance")]
    UnknownHandle(FeatureId),
}

/// Errors raised by the log-linear model.
///
/// Every variant signals a model or feature pool inconsistency and is
/// expected to abort the current inference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// A feature index is beyond the end of the weight vector.
    #[error("Feature index {index} is out of range for {len} weights")]
    WeightIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of weights.
        len: usize,
    },

    /// The weight vector does not match the pool's feature slot count.
    #[error("Expected {expected} weights for the feature pool, found {found}")]
    WeightCount {
        /// Slot count of the pool.
        expected: usize,
        /// Number of weights supplied.
        found: usize,
    },

    /// The exponentiated sums overflowed.
    #[error("Denominator overflowed while computing p({cv} | x)")]
    InfiniteDenominator {
        /// The queried correspondence variable.
        cv: String,
    },

    /// The exponentiated sums all underflowed to zero.
    #[error("Denominator underflowed to zero while computing p({cv} | x)")]
    ZeroDenominator {
        /// The queried correspondence variable.
        cv: String,
    },

    /// No correspondence variable classes were supplied.
    #[error("Cannot compute p({cv} | x) without any correspondence variables")]
    NoCorrespondenceVariables {
        /// The queried correspondence variable.
        cv: String,
    },
}
