use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{SearchError, SearchResult};

/// Tuning for [`crate::Dcg`].
///
/// Every field has a default, so a JSON document only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of partial solutions kept per language variable.
    pub beam_width: usize,
    /// Correspondence variables each factor is scored over.
    pub cvs: Vec<String>,
    /// The correspondence variable that assigns a symbol to its phrase.
    pub true_cv: String,
    /// Log every evaluated feature and expressed slot.
    pub debug: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 4,
            cvs: vec!["false".to_string(), "true".to_string()],
            true_cv: "true".to_string(),
            debug: false,
        }
    }
}

impl SearchConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> SearchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that the configuration can drive a search.
    pub fn validate(&self) -> SearchResult<()> {
        if self.beam_width == 0 {
            return Err(SearchError::InvalidConfig(
                "beam_width must be at least 1".to_string(),
            ));
        }
        if !self.cvs.contains(&self.true_cv) {
            return Err(SearchError::InvalidConfig(format!(
                "true_cv \"{}\" is not one of {:?}",
                self.true_cv, self.cvs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_fills_omitted_fields_with_defaults() {
        let config = SearchConfig::from_json_str(r#"{"beam_width": 8}"#).unwrap();

        assert_eq!(
            config,
            SearchConfig {
                beam_width: 8,
                ..SearchConfig::default()
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn it_rejects_unusable_configurations() {
        let narrow = SearchConfig {
            beam_width: 0,
            ..SearchConfig::default()
        };
        let stray = SearchConfig {
            true_cv: "yes".to_string(),
            ..SearchConfig::default()
        };

        assert!(matches!(narrow.validate(), Err(SearchError::InvalidConfig(_))));
        assert!(matches!(stray.validate(), Err(SearchError::InvalidConfig(_))));
    }
}
