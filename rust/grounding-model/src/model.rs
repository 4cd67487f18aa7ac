//! Model documents.
//!
//! A model is a `feature-pool` (one list of feature attributes per
//! constituent feature set) and an optional `llm` carrying comma-separated
//! weights, one per feature slot. Both an XML and a JSON encoding are
//! supported:
//!
//! ```xml
//! <model>
//!   <feature-pool>
//!     <constituent-feature-set>
//!       <feature class="cv" cv="true"/>
//!       <feature class="word" word="box"/>
//!     </constituent-feature-set>
//!   </feature-pool>
//!   <llm weights="0.5"/>
//! </model>
//! ```
//!
//! ```json
//! {
//!   "feature-pool": {
//!     "constituent-feature-sets": [[{"class": "cv", "cv": "true"}, {"class": "word", "word": "box"}]]
//!   },
//!   "llm": {"weights": "0.5"}
//! }
//! ```

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{Attributes, FeaturePool, Llm, ParseError, feature_from_attributes};

mod json;
mod xml;

/// Encodings a model document can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// `.xml`
    Xml,
    /// `.json`
    Json,
}

impl ModelFormat {
    /// The format implied by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("xml") => Ok(ModelFormat::Xml),
            Some(extension) if extension.eq_ignore_ascii_case("json") => Ok(ModelFormat::Json),
            _ => Err(ParseError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A decoded model document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    /// Feature attributes, one list per constituent feature set.
    pub constituent_feature_sets: Vec<Vec<Attributes>>,
    /// Weights of the `llm` element, when present.
    pub weights: Option<Vec<f64>>,
}

impl Model {
    /// Decode an XML model document.
    pub fn from_xml_str(document: &str) -> Result<Self, ParseError> {
        xml::read(document)
    }

    /// Encode as an XML model document.
    pub fn to_xml_string(&self) -> Result<String, ParseError> {
        xml::write(self)
    }

    /// Decode a JSON model document.
    pub fn from_json_str(document: &str) -> Result<Self, ParseError> {
        json::read(document)
    }

    /// Encode as a JSON model document.
    pub fn to_json_string(&self) -> Result<String, ParseError> {
        json::write(self)
    }

    /// Read a model document, choosing the encoding by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let format = ModelFormat::from_path(path)?;
        let document = std::fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        let model = match format {
            ModelFormat::Xml => Self::from_xml_str(&document),
            ModelFormat::Json => Self::from_json_str(&document),
        };
        if let Err(error) = &model {
            tracing::warn!(path = %path.display(), %error, "rejected model document");
        }
        model
    }

    /// Write the model document, choosing the encoding by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParseError> {
        let path = path.as_ref();
        let document = match ModelFormat::from_path(path)? {
            ModelFormat::Xml => self.to_xml_string()?,
            ModelFormat::Json => self.to_json_string()?,
        };
        std::fs::write(path, document).map_err(|source| io_error(path, source))
    }

    /// Snapshot a model's templates and weights.
    pub fn from_llm(llm: &Llm) -> Self {
        Self {
            constituent_feature_sets: llm.feature_pool().template_attributes(),
            weights: Some(llm.weights().to_vec()),
        }
    }

    /// Instantiate the features and weights. A document without weights
    /// yields a model with every weight zero.
    pub fn into_llm(self) -> Result<Llm, ParseError> {
        let templates = self
            .constituent_feature_sets
            .iter()
            .map(|set| {
                set.iter()
                    .map(feature_from_attributes)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let pool = FeaturePool::new(templates);

        let llm = match self.weights {
            Some(weights) => Llm::with_weights(pool, weights)?,
            None => Llm::new(pool),
        };
        tracing::info!(
            sets = self.constituent_feature_sets.len(),
            templates = llm.feature_pool().num_template_features(),
            weights = llm.weights().len(),
            "loaded model"
        );
        Ok(llm)
    }
}

impl Llm {
    /// Load a model from an `.xml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        Model::load(path)?.into_llm()
    }

    /// Save the model's templates and weights to an `.xml` or `.json` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParseError> {
        Model::from_llm(self).save(path)
    }

    /// Decode a model from an XML document.
    pub fn from_xml_str(document: &str) -> Result<Self, ParseError> {
        Model::from_xml_str(document)?.into_llm()
    }

    /// Decode a model from a JSON document.
    pub fn from_json_str(document: &str) -> Result<Self, ParseError> {
        Model::from_json_str(document)?.into_llm()
    }

    /// Encode the model as an XML document.
    pub fn to_xml_string(&self) -> Result<String, ParseError> {
        Model::from_llm(self).to_xml_string()
    }

    /// Encode the model as a JSON document.
    pub fn to_json_string(&self) -> Result<String, ParseError> {
        Model::from_llm(self).to_json_string()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ParseError {
    ParseError::Io {
        path: PathBuf::from(path),
        source,
    }
}

/// Parse a comma-separated weight list. Blank input is no weights.
fn parse_weights(text: &str) -> Result<Vec<f64>, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(position, value)| {
            let value = value.trim();
            value.parse().map_err(|_| ParseError::InvalidWeight {
                position,
                value: value.to_string(),
            })
        })
        .collect()
}

fn format_weights(weights: &[f64]) -> String {
    weights.iter().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmError;

    #[test]
    fn it_parses_weight_lists() {
        assert_eq!(parse_weights(" 0.5, -1,2e-3 ").unwrap(), vec![0.5, -1.0, 0.002]);
        assert_eq!(parse_weights("").unwrap(), Vec::<f64>::new());
        assert!(matches!(
            parse_weights("0.5,heavy"),
            Err(ParseError::InvalidWeight { position: 1, value }) if value == "heavy"
        ));
    }

    #[test]
    fn it_formats_weights_losslessly() {
        let weights = vec![0.1, -2.0, 1.0 / 3.0];

        assert_eq!(parse_weights(&format_weights(&weights)).unwrap(), weights);
    }

    #[test]
    fn it_chooses_formats_by_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("m.XML")).unwrap(), ModelFormat::Xml);
        assert_eq!(ModelFormat::from_path(Path::new("m.json")).unwrap(), ModelFormat::Json);
        assert!(matches!(
            ModelFormat::from_path(Path::new("m.yaml")),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn it_checks_weight_counts() {
        let model = Model {
            constituent_feature_sets: vec![vec![Attributes::new("cv").with("cv", "true")]],
            weights: Some(vec![1.0, 2.0]),
        };

        assert!(matches!(
            model.into_llm(),
            Err(ParseError::Llm(LlmError::WeightCount { expected: 1, found: 2 }))
        ));
    }
}
