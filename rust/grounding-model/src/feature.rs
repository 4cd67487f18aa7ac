use std::fmt::Debug;
use std::ops::BitOr;

use grounding_language::{LanguageVariable, Symbol};
use grounding_world::WorldDcg;

use crate::{Attributes, FeatureError, ParseError};

mod child;
pub use child::*;

mod cv;
pub use cv::*;

mod language;
pub use language::*;

mod symbol;
pub use symbol::*;

/// The tri-state result of evaluating a feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FeatureValue {
    /// Not evaluated since the instance was created or reset.
    #[default]
    Unknown,
    /// The feature fired.
    True,
    /// The feature did not fire.
    False,
}

impl FeatureValue {
    /// Whether the value is [`FeatureValue::True`].
    pub fn is_true(self) -> bool {
        self == FeatureValue::True
    }

    /// Whether the feature has been evaluated.
    pub fn is_known(self) -> bool {
        self != FeatureValue::Unknown
    }

    /// `True` for `condition != invert`, otherwise `False`.
    pub fn inverted(condition: bool, invert: bool) -> Self {
        Self::from(condition != invert)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        if value {
            FeatureValue::True
        } else {
            FeatureValue::False
        }
    }
}

/// The constituent category a feature belongs to.
///
/// The category decides how the [`FeaturePool`](crate::FeaturePool) shares
/// instances of the feature between factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureCategory {
    /// Depends only on the correspondence variable.
    Cv,
    /// Depends only on the language variable.
    Language,
    /// Depends only on the symbol and the world.
    StaticSymbol,
    /// Depends on the symbol and on the groundings of the language
    /// variable's children.
    DynamicSymbol,
}

impl FeatureCategory {
    /// Every category in slot order.
    pub const ALL: [FeatureCategory; 4] = [
        FeatureCategory::Cv,
        FeatureCategory::Language,
        FeatureCategory::StaticSymbol,
        FeatureCategory::DynamicSymbol,
    ];

    /// Position of this category within [`FeatureCategory::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Declarative set of the inputs a feature's value is sensitive to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DependsOn(u8);

impl DependsOn {
    /// The correspondence variable.
    pub const CV: DependsOn = DependsOn(1);
    /// The language variable (type, words, roles, children).
    pub const LANGUAGE_VARIABLE: DependsOn = DependsOn(1 << 1);
    /// The world.
    pub const WORLD: DependsOn = DependsOn(1 << 2);
    /// The symbol's own properties.
    pub const STATIC_SYMBOL: DependsOn = DependsOn(1 << 3);
    /// The symbol in relation to the language variable's child groundings.
    pub const DYNAMIC_SYMBOL: DependsOn = DependsOn(1 << 4);

    /// Flags set in either operand.
    pub const fn union(self, other: DependsOn) -> DependsOn {
        DependsOn(self.0 | other.0)
    }

    /// Whether every flag of `other` is set.
    pub fn contains(self, other: DependsOn) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DependsOn {
    type Output = DependsOn;

    fn bitor(self, rhs: DependsOn) -> DependsOn {
        self.union(rhs)
    }
}

/// A parameterized predicate over a grounding candidate.
///
/// Features are immutable parameter sets. The evaluated value of a feature
/// instance lives in the pool's arena, so one parameterization may back
/// many instances through [`Feature::dup`].
pub trait Feature: Debug + Send + Sync {
    /// The `class` attribute identifying the concrete feature type.
    fn class(&self) -> &'static str;

    /// The constituent category of this feature.
    fn category(&self) -> FeatureCategory;

    /// Inputs the result is sensitive to.
    fn depends_on(&self) -> DependsOn;

    /// Evaluate against one candidate.
    ///
    /// Missing optional data resolves to [`FeatureValue::False`]. An error
    /// signals a structurally malformed symbol.
    fn evaluate(
        &self,
        cv: &str,
        language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError>;

    /// The model-file attributes of this feature, `class` included.
    fn attributes(&self) -> Attributes;

    /// Canonical deduplication key covering class and parameters.
    fn key(&self) -> String {
        self.attributes().canonical_key()
    }

    /// An independent copy with the same parameters.
    fn dup(&self) -> Box<dyn Feature>;
}

/// Build the concrete feature selected by the `class` attribute.
pub fn feature_from_attributes(attributes: &Attributes) -> Result<Box<dyn Feature>, ParseError> {
    let Some(class) = attributes.class() else {
        return Err(ParseError::MissingAttribute {
            class: "feature".to_string(),
            attribute: crate::CLASS.to_string(),
        });
    };

    let feature: Box<dyn Feature> = match class {
        CvFeature::CLASS => Box::new(CvFeature::from_attributes(attributes)?),
        LanguageVariableTypeFeature::CLASS => {
            Box::new(LanguageVariableTypeFeature::from_attributes(attributes)?)
        }
        WordFeature::CLASS => Box::new(WordFeature::from_attributes(attributes)?),
        LanguageVariableRoleFeature::CLASS => {
            Box::new(LanguageVariableRoleFeature::from_attributes(attributes)?)
        }
        ChildConnectionFeature::CLASS => {
            Box::new(ChildConnectionFeature::from_attributes(attributes)?)
        }
        SymbolTypeFeature::CLASS => Box::new(SymbolTypeFeature::from_attributes(attributes)?),
        SymbolAttributeValueFeature::CLASS => {
            Box::new(SymbolAttributeValueFeature::from_attributes(attributes)?)
        }
        ObjectIsUniqueFeature::CLASS => Box::new(ObjectIsUniqueFeature::from_attributes(attributes)?),
        ObjectSortPositionFeature::CLASS => {
            Box::new(ObjectSortPositionFeature::from_attributes(attributes)?)
        }
        SymbolMatchesChildFeature::CLASS => {
            Box::new(SymbolMatchesChildFeature::from_attributes(attributes)?)
        }
        ObjectSpatiallyRelatedToChildFeature::CLASS => {
            Box::new(ObjectSpatiallyRelatedToChildFeature::from_attributes(attributes)?)
        }
        ObjectExtremumOfChildFeature::CLASS => {
            Box::new(ObjectExtremumOfChildFeature::from_attributes(attributes)?)
        }
        other => return Err(ParseError::UnknownFeatureClass(other.to_string())),
    };

    Ok(feature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_dispatches_on_class() {
        let attributes = Attributes::new("word").with("word", "box");
        let feature = feature_from_attributes(&attributes).unwrap();

        assert_eq!(feature.class(), "word");
        assert_eq!(feature.category(), FeatureCategory::Language);
        assert_eq!(feature.key(), "word(word=box)");
        assert_eq!(feature.dup().key(), feature.key());
    }

    #[test]
    fn it_rejects_unknown_classes() {
        let result = feature_from_attributes(&Attributes::new("telepathy"));

        assert!(matches!(result, Err(ParseError::UnknownFeatureClass(class)) if class == "telepathy"));
    }

    #[test]
    fn it_combines_dependency_flags() {
        let flags = DependsOn::WORLD | DependsOn::STATIC_SYMBOL;

        assert!(flags.contains(DependsOn::WORLD));
        assert!(flags.contains(DependsOn::STATIC_SYMBOL));
        assert!(!flags.contains(DependsOn::CV));
    }

    #[test]
    fn it_inverts_values() {
        assert_eq!(FeatureValue::inverted(true, false), FeatureValue::True);
        assert_eq!(FeatureValue::inverted(true, true), FeatureValue::False);
        assert_eq!(FeatureValue::inverted(false, true), FeatureValue::True);
        assert!(!FeatureValue::Unknown.is_known());
    }
}
