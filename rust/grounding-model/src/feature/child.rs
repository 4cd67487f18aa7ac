use grounding_language::{AXIS, EXTREMUM, LanguageVariable, OBJECT, SORT_KEY, SPATIAL_RELATION, Symbol};
use grounding_world::{Object, SortKey, WorldDcg};

use crate::feature::symbol::grounded_object;
use crate::{
    Attributes, DependsOn, Feature, FeatureCategory, FeatureError, FeatureValue, ParseError,
};

const DYNAMIC: DependsOn = DependsOn::DYNAMIC_SYMBOL.union(DependsOn::LANGUAGE_VARIABLE);

/// A world axis with a direction, parsed from `+x`, `-y`, ...
#[derive(Debug, Clone, Copy, PartialEq)]
struct SignedAxis {
    index: usize,
    sign: f64,
}

impl SignedAxis {
    fn parse(value: &str) -> Option<Self> {
        let mut chars = value.chars();
        let sign = match chars.next()? {
            '+' => 1.0,
            '-' => -1.0,
            _ => return None,
        };
        let index = match chars.next()? {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            _ => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(Self { index, sign })
    }
}

/// Fires when the symbol is one of the groundings of the (labelled)
/// children of the language variable.
///
/// Only symbols of `symbol_type` are considered. With no child groundings
/// to compare against the feature is `False` whatever `invert` says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatchesChildFeature {
    /// Symbol type the feature applies to.
    pub symbol_type: String,
    /// Restrict to children under this edge label.
    pub edge_label: Option<String>,
    /// Fire on a mismatch instead of a match.
    pub invert: bool,
}

impl SymbolMatchesChildFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "symbol_matches_child";

    /// A non-inverted feature over every child.
    pub fn new(symbol_type: impl Into<String>) -> Self {
        Self {
            symbol_type: symbol_type.into(),
            edge_label: None,
            invert: false,
        }
    }

    /// Builder-style helper that restricts the edge label.
    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = Some(edge_label.into());
        self
    }

    /// Builder-style helper that sets `invert`.
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self {
            symbol_type: attributes.required(Self::CLASS, "symbol_type")?.to_string(),
            edge_label: attributes.optional("edge_label"),
            invert: attributes.required_bool(Self::CLASS, "invert")?,
        })
    }
}

impl Feature for SymbolMatchesChildFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::DynamicSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DYNAMIC
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        _world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        if !symbol.is(&self.symbol_type) {
            return Ok(FeatureValue::False);
        }

        let mut groundings = language_variable
            .child_groundings(self.edge_label.as_deref())
            .peekable();
        if groundings.peek().is_none() {
            return Ok(FeatureValue::False);
        }

        let matched = groundings.any(|grounding| grounding == symbol);
        Ok(FeatureValue::inverted(matched, self.invert))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with("symbol_type", &self.symbol_type)
            .with_optional("edge_label", self.edge_label.as_deref())
            .with("invert", self.invert)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the symbol's object lies beyond every landmark object along
/// the axis of a spatial relation grounded by the children.
///
/// Children are expected to ground a `spatial_relation` carrying an `axis`
/// property and one or more `object` landmarks. A relation without a
/// well-formed axis is an error. Missing landmarks, relations or poses
/// make the feature `False`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpatiallyRelatedToChildFeature {
    /// Restrict to children under this edge label.
    pub edge_label: Option<String>,
    /// Fire when the object is not beyond the landmarks instead.
    pub invert: bool,
}

impl ObjectSpatiallyRelatedToChildFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "object_spatially_related_to_child";

    /// A non-inverted feature over every child.
    pub fn new() -> Self {
        Self {
            edge_label: None,
            invert: false,
        }
    }

    /// Builder-style helper that restricts the edge label.
    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = Some(edge_label.into());
        self
    }

    /// Builder-style helper that sets `invert`.
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self {
            edge_label: attributes.optional("edge_label"),
            invert: attributes.required_bool(Self::CLASS, "invert")?,
        })
    }

    fn axis_of(relation: &Symbol) -> Result<SignedAxis, FeatureError> {
        let value = relation
            .property(AXIS)
            .ok_or_else(|| FeatureError::MissingProperty {
                class: Self::CLASS,
                property: AXIS,
                symbol: relation.key(),
            })?;
        SignedAxis::parse(value).ok_or_else(|| FeatureError::MalformedProperty {
            class: Self::CLASS,
            property: AXIS,
            value: value.to_string(),
            symbol: relation.key(),
        })
    }
}

impl Default for ObjectSpatiallyRelatedToChildFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for ObjectSpatiallyRelatedToChildFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::DynamicSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DYNAMIC | DependsOn::WORLD
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let groundings: Vec<&Symbol> = language_variable
            .child_groundings(self.edge_label.as_deref())
            .collect();

        let axes = groundings
            .iter()
            .filter(|grounding| grounding.is(SPATIAL_RELATION))
            .map(|relation| Self::axis_of(relation))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(position) = grounded_object(world, symbol).and_then(Object::position) else {
            return Ok(FeatureValue::False);
        };

        let landmarks: Vec<_> = groundings
            .iter()
            .filter(|grounding| grounding.is(OBJECT) && grounding.uid() != symbol.uid())
            .filter_map(|landmark| grounded_object(world, landmark))
            .filter_map(Object::position)
            .collect();

        if axes.is_empty() || landmarks.is_empty() {
            return Ok(FeatureValue::False);
        }

        let related = axes.iter().any(|axis| {
            landmarks.iter().all(|landmark| {
                axis.sign * (position[axis.index] - landmark[axis.index]) > 0.0
            })
        });
        Ok(FeatureValue::inverted(related, self.invert))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with_optional("edge_label", self.edge_label.as_deref())
            .with("invert", self.invert)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the symbol's object comes first among objects of its type
/// in the sort table selected by an `extremum` grounded by the children.
///
/// An extremum without a parseable `sort_key` property is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectExtremumOfChildFeature {
    /// Restrict to children under this edge label.
    pub edge_label: Option<String>,
}

impl ObjectExtremumOfChildFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "object_extremum_of_child";

    /// A feature over every child.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper that restricts the edge label.
    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = Some(edge_label.into());
        self
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self {
            edge_label: attributes.optional("edge_label"),
        })
    }

    fn sort_key_of(extremum: &Symbol) -> Result<SortKey, FeatureError> {
        let value = extremum
            .property(SORT_KEY)
            .ok_or_else(|| FeatureError::MissingProperty {
                class: Self::CLASS,
                property: SORT_KEY,
                symbol: extremum.key(),
            })?;
        value.parse().map_err(|_| FeatureError::MalformedProperty {
            class: Self::CLASS,
            property: SORT_KEY,
            value: value.to_string(),
            symbol: extremum.key(),
        })
    }
}

impl Feature for ObjectExtremumOfChildFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::DynamicSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DYNAMIC | DependsOn::WORLD
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let sort_keys = language_variable
            .child_groundings(self.edge_label.as_deref())
            .filter(|grounding| grounding.is(EXTREMUM))
            .map(Self::sort_key_of)
            .collect::<Result<Vec<_>, _>>()?;

        let Some(object) = grounded_object(world, symbol) else {
            return Ok(FeatureValue::False);
        };
        let Some(object_type) = object.object_type() else {
            return Ok(FeatureValue::False);
        };

        let first = sort_keys.into_iter().any(|sort_key| {
            world
                .sorted_objects(sort_key)
                .and_then(|table| table.nth(object_type, 0))
                == Some(object.uid.as_str())
        });
        Ok(FeatureValue::from(first))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS).with_optional("edge_label", self.edge_label.as_deref())
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use grounding_world::{OBJECT_TYPE, World};

    fn world() -> WorldDcg {
        [
            Object::new("box1").with_property(OBJECT_TYPE, "box").at(1.0, 0.0, 0.0),
            Object::new("box2").with_property(OBJECT_TYPE, "box").at(3.0, 0.0, 0.0),
            Object::new("ball1").with_property(OBJECT_TYPE, "ball").at(2.0, 0.0, 0.0),
        ]
        .into_iter()
        .collect::<World>()
        .into()
    }

    /// `the box (right of the ball)` with the PP child grounded to `symbols`.
    fn grounded(symbols: Vec<Symbol>) -> LanguageVariable {
        let symbols: Vec<Arc<Symbol>> = symbols.into_iter().map(Arc::new).collect();
        LanguageVariable::new("NP")
            .with_text("the box")
            .with_labelled_child("nmod", LanguageVariable::new("PP").with_text("right of the ball"))
            .with_child_groundings(&[symbols])
            .unwrap()
    }

    fn right_of() -> Symbol {
        Symbol::new(SPATIAL_RELATION).with_property(AXIS, "+x")
    }

    #[test]
    fn it_parses_signed_axes() {
        assert_eq!(SignedAxis::parse("+y"), Some(SignedAxis { index: 1, sign: 1.0 }));
        assert_eq!(SignedAxis::parse("-z"), Some(SignedAxis { index: 2, sign: -1.0 }));
        assert_eq!(SignedAxis::parse("x"), None);
        assert_eq!(SignedAxis::parse("+xy"), None);
        assert_eq!(SignedAxis::parse(""), None);
    }

    #[test]
    fn it_matches_child_groundings() {
        let world = world();
        let lv = grounded(vec![Symbol::object("ball1")]);
        let feature = SymbolMatchesChildFeature::new(OBJECT).with_edge_label("nmod");

        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("ball1")),
            Ok(FeatureValue::True)
        );
        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box1")),
            Ok(FeatureValue::False)
        );
        assert_eq!(
            feature
                .clone()
                .inverted(true)
                .evaluate("true", &lv, &world, &Symbol::object("box1")),
            Ok(FeatureValue::True)
        );

        let ungrounded = grounded(vec![]);
        assert_eq!(
            feature
                .inverted(true)
                .evaluate("true", &ungrounded, &world, &Symbol::object("box1")),
            Ok(FeatureValue::False)
        );
    }

    #[test]
    fn it_relates_objects_to_landmarks_along_an_axis() {
        let world = world();
        let lv = grounded(vec![right_of(), Symbol::object("ball1")]);
        let feature = ObjectSpatiallyRelatedToChildFeature::new().with_edge_label("nmod");

        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box2")),
            Ok(FeatureValue::True)
        );
        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box1")),
            Ok(FeatureValue::False)
        );
        assert_eq!(
            feature
                .inverted(true)
                .evaluate("true", &lv, &world, &Symbol::object("box1")),
            Ok(FeatureValue::True)
        );
    }

    #[test]
    fn it_treats_missing_landmarks_as_false() {
        let world = world();
        let lv = grounded(vec![right_of(), Symbol::object("nowhere")]);
        let feature = ObjectSpatiallyRelatedToChildFeature::new().inverted(true);

        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box2")),
            Ok(FeatureValue::False)
        );
    }

    #[test]
    fn it_rejects_malformed_axes() {
        let world = world();
        let feature = ObjectSpatiallyRelatedToChildFeature::new();

        let missing = grounded(vec![Symbol::new(SPATIAL_RELATION), Symbol::object("ball1")]);
        assert!(matches!(
            feature.evaluate("true", &missing, &world, &Symbol::object("box2")),
            Err(FeatureError::MissingProperty { property: AXIS, .. })
        ));

        let sideways = Symbol::new(SPATIAL_RELATION).with_property(AXIS, "sideways");
        let malformed = grounded(vec![sideways, Symbol::object("ball1")]);
        assert!(matches!(
            feature.evaluate("true", &malformed, &world, &Symbol::object("box2")),
            Err(FeatureError::MalformedProperty { value, .. }) if value == "sideways"
        ));
    }

    #[test]
    fn it_selects_extrema_by_sort_key() {
        let world = world();
        let rightmost = Symbol::new(EXTREMUM).with_property(SORT_KEY, "max_x_axis");
        let lv = grounded(vec![rightmost]);
        let feature = ObjectExtremumOfChildFeature::new();

        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box2")),
            Ok(FeatureValue::True)
        );
        assert_eq!(
            feature.evaluate("true", &lv, &world, &Symbol::object("box1")),
            Ok(FeatureValue::False)
        );

        let bogus = grounded(vec![Symbol::new(EXTREMUM).with_property(SORT_KEY, "tallest")]);
        assert!(matches!(
            feature.evaluate("true", &bogus, &world, &Symbol::object("box2")),
            Err(FeatureError::MalformedProperty { property: SORT_KEY, .. })
        ));
    }
}
