use serde::{Deserialize, Serialize};

use super::{Model, format_weights, parse_weights};
use crate::{Attributes, ParseError};

#[derive(Serialize, Deserialize)]
struct ModelDocument {
    #[serde(rename = "feature-pool")]
    feature_pool: FeaturePoolDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    llm: Option<LlmDocument>,
}

#[derive(Serialize, Deserialize)]
struct FeaturePoolDocument {
    #[serde(rename = "constituent-feature-sets", default)]
    constituent_feature_sets: Vec<Vec<Attributes>>,
}

#[derive(Serialize, Deserialize)]
struct LlmDocument {
    weights: String,
}

pub(super) fn read(document: &str) -> Result<Model, ParseError> {
    let document: ModelDocument = serde_json::from_str(document)?;
    let weights = document
        .llm
        .map(|llm| parse_weights(&llm.weights))
        .transpose()?;
    Ok(Model {
        constituent_feature_sets: document.feature_pool.constituent_feature_sets,
        weights,
    })
}

pub(super) fn write(model: &Model) -> Result<String, ParseError> {
    let document = ModelDocument {
        feature_pool: FeaturePoolDocument {
            constituent_feature_sets: model.constituent_feature_sets.clone(),
        },
        llm: model.weights.as_deref().map(|weights| LlmDocument {
            weights: format_weights(weights),
        }),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
