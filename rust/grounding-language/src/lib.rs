//! Inputs to grounding: what the utterance says and what it might mean.
//!
//! A [`LanguageVariable`] is one node of a parsed utterance (a phrase with
//! its words, role annotations and child phrases). A [`Symbol`] is one
//! candidate meaning: a typed property bag such as an object reference or a
//! spatial relation. Both expose a structural key that the feature pool
//! uses to decide when two factors can share feature instances.

mod error;
pub use error::*;

mod key;
pub use key::*;

mod language_variable;
pub use language_variable::*;

mod symbol;
pub use symbol::*;
