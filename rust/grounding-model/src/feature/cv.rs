use grounding_language::{LanguageVariable, Symbol};
use grounding_world::WorldDcg;

use crate::{
    Attributes, DependsOn, Feature, FeatureCategory, FeatureError, FeatureValue, ParseError,
};

/// Fires when the correspondence variable equals `cv`.
///
/// Pairing a `cv` feature with other categories in a constituent feature
/// set gives every other feature one weight per correspondence variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvFeature {
    /// The correspondence variable this feature fires for.
    pub cv: String,
}

impl CvFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "cv";

    /// A feature firing for `cv`.
    pub fn new(cv: impl Into<String>) -> Self {
        Self { cv: cv.into() }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(attributes.required(Self::CLASS, "cv")?))
    }
}

impl Feature for CvFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Cv
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::CV
    }

    fn evaluate(
        &self,
        cv: &str,
        _language_variable: &LanguageVariable,
        _world: &WorldDcg,
        _symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        Ok(FeatureValue::from(cv == self.cv))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS).with("cv", &self.cv)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}
