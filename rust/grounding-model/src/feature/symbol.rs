use grounding_language::{LanguageVariable, Symbol};
use grounding_world::{Object, SortKey, WorldDcg};

use crate::{
    Attributes, DependsOn, Feature, FeatureCategory, FeatureError, FeatureValue, ParseError,
};

/// The world object a symbol refers to through its `uid` property.
pub(crate) fn grounded_object<'a>(world: &'a WorldDcg, symbol: &Symbol) -> Option<&'a Object> {
    world.object(symbol.uid()?)
}

/// Fires when the symbol has the given type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTypeFeature {
    /// Expected symbol type.
    pub symbol_type: String,
}

impl SymbolTypeFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "symbol_type";

    /// A feature firing for symbols of type `symbol_type`.
    pub fn new(symbol_type: impl Into<String>) -> Self {
        Self {
            symbol_type: symbol_type.into(),
        }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(attributes.required(Self::CLASS, "symbol_type")?))
    }
}

impl Feature for SymbolTypeFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::StaticSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::STATIC_SYMBOL
    }

    fn evaluate(
        &self,
        _cv: &str,
        _language_variable: &LanguageVariable,
        _world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        Ok(FeatureValue::from(symbol.is(&self.symbol_type)))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS).with("symbol_type", &self.symbol_type)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when a symbol of `symbol_type` has `attribute_type` equal to
/// `attribute_value`.
///
/// The attribute is read from the symbol's own properties first, then from
/// the properties of the world object the symbol refers to. When neither
/// has it, or the symbol has another type, the feature is `False` whatever
/// `invert` says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAttributeValueFeature {
    /// Symbol type the feature applies to.
    pub symbol_type: String,
    /// Property to read.
    pub attribute_type: String,
    /// Value to compare against.
    pub attribute_value: String,
    /// Fire on a mismatch instead of a match.
    pub invert: bool,
}

impl SymbolAttributeValueFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "symbol_attribute_value";

    /// A non-inverted feature.
    pub fn new(
        symbol_type: impl Into<String>,
        attribute_type: impl Into<String>,
        attribute_value: impl Into<String>,
    ) -> Self {
        Self {
            symbol_type: symbol_type.into(),
            attribute_type: attribute_type.into(),
            attribute_value: attribute_value.into(),
            invert: false,
        }
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
            attribute_type: attributes.required(Self::CLASS, "attribute_type")?.to_string(),
            attribute_value: attributes.required(Self::CLASS, "attribute_value")?.to_string(),
            invert: attributes.required_bool(Self::CLASS, "invert")?,
        })
    }
}

impl Feature for SymbolAttributeValueFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::StaticSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::STATIC_SYMBOL | DependsOn::WORLD
    }

    fn evaluate(
        &self,
        _cv: &str,
        _language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        if !symbol.is(&self.symbol_type) {
            return Ok(FeatureValue::False);
        }

        let value = symbol.property(&self.attribute_type).or_else(|| {
            grounded_object(world, symbol).and_then(|object| object.property(&self.attribute_type))
        });

        Ok(match value {
            Some(value) => FeatureValue::inverted(value == self.attribute_value, self.invert),
            None => FeatureValue::False,
        })
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with("symbol_type", &self.symbol_type)
            .with("attribute_type", &self.attribute_type)
            .with("attribute_value", &self.attribute_value)
            .with("invert", self.invert)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the symbol's object is the only object of its type in the
/// world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIsUniqueFeature {
    /// Fire when the object is not unique instead.
    pub invert: bool,
}

impl ObjectIsUniqueFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "object_is_unique";

    /// A feature with the given `invert` flag.
    pub fn new(invert: bool) -> Self {
        Self { invert }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(attributes.required_bool(Self::CLASS, "invert")?))
    }
}

impl Feature for ObjectIsUniqueFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::StaticSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::STATIC_SYMBOL | DependsOn::WORLD
    }

    fn evaluate(
        &self,
        _cv: &str,
        _language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let Some(object_type) =
            grounded_object(world, symbol).and_then(|object| object.object_type())
        else {
            return Ok(FeatureValue::False);
        };

        let unique = world.count_of_type(object_type) == 1;
        Ok(FeatureValue::inverted(unique, self.invert))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS).with("invert", self.invert)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the symbol's object sits at `index` among objects of its
/// type, in the precomputed order for `sort_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSortPositionFeature {
    /// Table to look in.
    pub sort_key: SortKey,
    /// Zero-based position within the object's type bucket.
    pub index: usize,
}

impl ObjectSortPositionFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "object_sort_position";

    /// A feature firing for the `index`-th object under `sort_key`.
    pub fn new(sort_key: SortKey, index: usize) -> Self {
        Self { sort_key, index }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(
            attributes.required_parsed(Self::CLASS, "sort_key")?,
            attributes.required_parsed(Self::CLASS, "index")?,
        ))
    }
}

impl Feature for ObjectSortPositionFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::StaticSymbol
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::STATIC_SYMBOL | DependsOn::WORLD
    }

    fn evaluate(
        &self,
        _cv: &str,
        _language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let position = symbol
            .uid()
            .and_then(|uid| world.sort_position(self.sort_key, uid));
        Ok(FeatureValue::from(position == Some(self.index)))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with("sort_key", self.sort_key)
            .with("index", self.index)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounding_world::{OBJECT_TYPE, World};

    fn world() -> WorldDcg {
        [
            Object::new("box1").with_property(OBJECT_TYPE, "box").at(1.0, 0.0, 0.0),
            Object::new("box2").with_property(OBJECT_TYPE, "box").at(2.0, 0.0, 0.0),
            Object::new("ball1").with_property(OBJECT_TYPE, "ball").at(0.0, 1.0, 0.0),
            Object::new("ghost"),
        ]
        .into_iter()
        .collect::<World>()
        .into()
    }

    fn evaluate(feature: &dyn Feature, world: &WorldDcg, symbol: &Symbol) -> FeatureValue {
        feature
            .evaluate("true", &LanguageVariable::new("NP"), world, symbol)
            .unwrap()
    }

    #[test]
    fn it_reads_attributes_from_the_symbol_before_the_world() {
        let world = world();
        let feature = SymbolAttributeValueFeature::new("object", "color", "red");
        let red = Symbol::object("box1").with_property("color", "red");

        assert_eq!(evaluate(&feature, &world, &red), FeatureValue::True);
        assert_eq!(evaluate(&feature, &world, &Symbol::object("box1")), FeatureValue::False);
        assert_eq!(
            evaluate(&feature.clone().inverted(true), &world, &Symbol::object("box1")),
            FeatureValue::False
        );
    }

    #[test]
    fn it_ignores_symbols_of_other_types() {
        let world = world();
        let feature = SymbolAttributeValueFeature::new("object", "object_type", "box").inverted(true);
        let relation = Symbol::new("spatial_relation").with_property("object_type", "ball");

        assert_eq!(evaluate(&feature, &world, &relation), FeatureValue::False);
    }

    #[test]
    fn it_detects_unique_objects() {
        let world = world();

        assert_eq!(
            evaluate(&ObjectIsUniqueFeature::new(false), &world, &Symbol::object("ball1")),
            FeatureValue::True
        );
        assert_eq!(
            evaluate(&ObjectIsUniqueFeature::new(false), &world, &Symbol::object("box1")),
            FeatureValue::False
        );
        assert_eq!(
            evaluate(&ObjectIsUniqueFeature::new(true), &world, &Symbol::object("box1")),
            FeatureValue::True
        );
        assert_eq!(
            evaluate(&ObjectIsUniqueFeature::new(true), &world, &Symbol::object("ghost")),
            FeatureValue::False
        );
    }

    #[test]
    fn it_finds_sort_positions_within_type_buckets() {
        let world = world();
        let rightmost = ObjectSortPositionFeature::new(SortKey::MaxXAxis, 0);

        assert_eq!(evaluate(&rightmost, &world, &Symbol::object("box2")), FeatureValue::True);
        assert_eq!(evaluate(&rightmost, &world, &Symbol::object("box1")), FeatureValue::False);
        assert_eq!(evaluate(&rightmost, &world, &Symbol::object("ball1")), FeatureValue::True);
        assert_eq!(evaluate(&rightmost, &world, &Symbol::object("missing")), FeatureValue::False);
    }

    #[test]
    fn it_parses_sort_position_attributes() {
        let attributes = Attributes::new(ObjectSortPositionFeature::CLASS)
            .with("sort_key", "min_y_axis")
            .with("index", "2");
        let feature = ObjectSortPositionFeature::from_attributes(&attributes).unwrap();

        assert_eq!(feature, ObjectSortPositionFeature::new(SortKey::MinYAxis, 2));
        assert_eq!(feature.attributes(), attributes);

        let bad = attributes.with("sort_key", "sideways");
        assert!(matches!(
            ObjectSortPositionFeature::from_attributes(&bad),
            Err(ParseError::InvalidAttribute { attribute, .. }) if attribute == "sort_key"
        ));
    }
}
