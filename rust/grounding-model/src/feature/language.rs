use grounding_language::{LanguageVariable, Symbol};
use grounding_world::WorldDcg;

use crate::{
    Attributes, DependsOn, Feature, FeatureCategory, FeatureError, FeatureValue, ParseError,
};

/// Fires when the language variable has the given phrase type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVariableTypeFeature {
    /// Expected phrase type.
    pub language_variable_type: String,
}

impl LanguageVariableTypeFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "language_variable_type";

    /// A feature firing for phrases of type `language_variable_type`.
    pub fn new(language_variable_type: impl Into<String>) -> Self {
        Self {
            language_variable_type: language_variable_type.into(),
        }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(attributes.required(Self::CLASS, "type")?))
    }
}

impl Feature for LanguageVariableTypeFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Language
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::LANGUAGE_VARIABLE
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        _world: &WorldDcg,
        _symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        Ok(FeatureValue::from(
            language_variable.kind == self.language_variable_type,
        ))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS).with("type", &self.language_variable_type)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the phrase contains a word, optionally with a given
/// part-of-speech tag. Word text is compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFeature {
    /// The word to look for.
    pub word: String,
    /// Required part-of-speech tag, if any.
    pub pos: Option<String>,
}

impl WordFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "word";

    /// A feature firing when `word` appears with any tag.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            pos: None,
        }
    }

    /// Builder-style helper that requires a part-of-speech tag.
    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self {
            word: attributes.required(Self::CLASS, "word")?.to_string(),
            pos: attributes.optional("pos"),
        })
    }
}

impl Feature for WordFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Language
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::LANGUAGE_VARIABLE
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        _world: &WorldDcg,
        _symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let found = language_variable.words.iter().any(|word| {
            word.text.eq_ignore_ascii_case(&self.word)
                && match &self.pos {
                    Some(pos) => word.pos.as_ref() == Some(pos),
                    None => true,
                }
        });
        Ok(FeatureValue::from(found))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with("word", &self.word)
            .with_optional("pos", self.pos.as_deref())
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the phrase carries a role annotation with the given value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVariableRoleFeature {
    /// Role type to look up.
    pub role_type: String,
    /// Expected value of the role.
    pub role_value: String,
}

impl LanguageVariableRoleFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "language_variable_role";

    /// A feature firing when `role_type` is annotated as `role_value`.
    pub fn new(role_type: impl Into<String>, role_value: impl Into<String>) -> Self {
        Self {
            role_type: role_type.into(),
            role_value: role_value.into(),
        }
    }

    /// Parse from model-file attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ParseError> {
        attributes.expect_class(Self::CLASS)?;
        Ok(Self::new(
            attributes.required(Self::CLASS, "role_type")?,
            attributes.required(Self::CLASS, "role_value")?,
        ))
    }
}

impl Feature for LanguageVariableRoleFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Language
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::LANGUAGE_VARIABLE
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        _world: &WorldDcg,
        _symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        Ok(FeatureValue::from(
            language_variable.role(&self.role_type) == Some(self.role_value.as_str()),
        ))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with("role_type", &self.role_type)
            .with("role_value", &self.role_value)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}

/// Fires when the phrase has a child of the given type, optionally
/// restricted to connections with a given edge label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildConnectionFeature {
    /// Required edge label, if any.
    pub edge_label: Option<String>,
    /// Expected child phrase type.
    pub child_type: String,
}

impl ChildConnectionFeature {
    /// Class attribute.
    pub const CLASS: &'static str = "child_connection";

    /// A feature firing for any child of type `child_type`.
    pub fn new(child_type: impl Into<String>) -> Self {
        Self {
            edge_label: None,
            child_type: child_type.into(),
        }
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
            child_type: attributes.required(Self::CLASS, "child_type")?.to_string(),
        })
    }
}

impl Feature for ChildConnectionFeature {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Language
    }

    fn depends_on(&self) -> DependsOn {
        DependsOn::LANGUAGE_VARIABLE
    }

    fn evaluate(
        &self,
        _cv: &str,
        language_variable: &LanguageVariable,
        _world: &WorldDcg,
        _symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        let found = language_variable
            .children_labelled(self.edge_label.as_deref())
            .any(|child| child.kind == self.child_type);
        Ok(FeatureValue::from(found))
    }

    fn attributes(&self) -> Attributes {
        Attributes::new(Self::CLASS)
            .with_optional("edge_label", self.edge_label.as_deref())
            .with("child_type", &self.child_type)
    }

    fn dup(&self) -> Box<dyn Feature> {
        Box::new(self.clone())
    }
}
