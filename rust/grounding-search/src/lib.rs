#![warn(missing_docs)]

//! Search for the most probable groundings of a parsed utterance.
//!
//! A [`SymbolSpace`] enumerates every candidate meaning for a world: one
//! object symbol per world object plus every property combination a
//! [`SymbolDictionary`] allows for the other symbol types. [`Dcg`] walks the
//! language tree bottom-up, scores each candidate against each phrase with
//! the log-linear model, and keeps the best [`Solution`]s in a beam.

mod config;
pub use config::*;

mod dcg;
pub use dcg::*;

mod error;
pub use error::*;

mod symbol_space;
pub use symbol_space::*;
