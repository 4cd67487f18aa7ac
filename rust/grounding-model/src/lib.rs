#![warn(missing_docs)]

//! Feature evaluation and log-linear scoring for grounded language.
//!
//! A [`Feature`] is a predicate over one grounding candidate: a
//! correspondence variable, a [`LanguageVariable`](grounding_language::LanguageVariable),
//! the [`WorldDcg`](grounding_world::WorldDcg) and a candidate
//! [`Symbol`](grounding_language::Symbol). A model groups its features into
//! constituent feature sets; each set expands to the cartesian product of
//! its non-empty categories, and every combination is one weighted slot of
//! the [`Llm`].
//!
//! The [`FeaturePool`] owns every feature instance and decides, per
//! category, which instances two [`Factor`]s share. A factor evaluates its
//! [`FeatureSet`] into the fired slot indices of each correspondence
//! variable, and [`Llm::pygx`] turns those into a normalized probability.
//!
//! ```
//! use std::sync::Arc;
//!
//! use grounding_language::{LanguageVariable, Symbol};
//! use grounding_model::{ExpressedFeatures, Factor, Llm};
//! use grounding_world::WorldDcg;
//!
//! let mut llm = Llm::from_json_str(r#"{
//!     "feature-pool": {"constituent-feature-sets": [[
//!         {"class": "cv", "cv": "false"},
//!         {"class": "cv", "cv": "true"},
//!         {"class": "word", "word": "box"}
//!     ]]},
//!     "llm": {"weights": "0,1"}
//! }"#).unwrap();
//!
//! let lv = Arc::new(LanguageVariable::new("NP").with_text("the box"));
//! let symbol = Arc::new(Symbol::object("b1"));
//! let cvs = vec!["false".to_string(), "true".to_string()];
//!
//! let mut factor = Factor::from_pool(symbol, lv, cvs, llm.feature_pool_mut()).unwrap();
//! factor
//!     .evaluate(llm.feature_pool_mut(), &WorldDcg::default(), &mut ExpressedFeatures::new(), false)
//!     .unwrap();
//! factor.score(&llm).unwrap();
//!
//! let p = factor.value("true").unwrap();
//! assert!((p - 1.0_f64.exp() / (1.0 + 1.0_f64.exp())).abs() < 1e-12);
//! ```

mod attributes;
pub use attributes::*;

mod error;
pub use error::*;

mod factor;
pub use factor::*;

mod feature;
pub use feature::*;

mod feature_pool;
pub use feature_pool::*;

mod feature_set;
pub use feature_set::*;

mod llm;
pub use llm::*;

mod model;
pub use model::*;

mod training;
pub use training::*;
