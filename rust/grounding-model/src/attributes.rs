use std::collections::BTreeMap;
use std::fmt::Write;
use std::str::FromStr;

use grounding_language::KeyComponent;
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Name of the attribute selecting a feature's concrete type.
pub const CLASS: &str = "class";

/// The flat string attributes describing one feature in a model document.
///
/// Both the XML and JSON model formats reduce every feature to this shape:
/// a `class` naming the feature type plus its type-specific parameters.
/// Attributes are kept sorted, which makes [`Attributes::canonical_key`]
/// independent of the order they were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Attributes holding only a `class`.
    pub fn new(class: &str) -> Self {
        let mut attributes = Self::default();
        attributes.insert(CLASS, class);
        attributes
    }

    /// Builder-style helper that sets an attribute.
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style helper that sets an attribute only when present.
    pub fn with_optional(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Set an attribute.
    pub fn insert(&mut self, name: &str, value: impl ToString) {
        self.0.insert(name.to_string(), value.to_string());
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The `class` attribute.
    pub fn class(&self) -> Option<&str> {
        self.get(CLASS)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Fail unless the `class` attribute equals `class`.
    pub fn expect_class(&self, class: &'static str) -> Result<(), ParseError> {
        match self.class() {
            Some(found) if found == class => Ok(()),
            Some(found) => Err(ParseError::ClassMismatch {
                expected: class,
                found: found.to_string(),
            }),
            None => Err(ParseError::MissingAttribute {
                class: class.to_string(),
                attribute: CLASS.to_string(),
            }),
        }
    }

    /// A required string attribute of a feature of type `class`.
    pub fn required(&self, class: &str, name: &str) -> Result<&str, ParseError> {
        self.get(name).ok_or_else(|| ParseError::MissingAttribute {
            class: class.to_string(),
            attribute: name.to_string(),
        })
    }

    /// A required attribute parsed with [`FromStr`].
    pub fn required_parsed<T>(&self, class: &str, name: &str) -> Result<T, ParseError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        let value = self.required(class, name)?;
        value.parse().map_err(|error: T::Err| ParseError::InvalidAttribute {
            class: class.to_string(),
            attribute: name.to_string(),
            value: value.to_string(),
            reason: error.to_string(),
        })
    }

    /// A required `"true"`/`"false"` attribute.
    pub fn required_bool(&self, class: &str, name: &str) -> Result<bool, ParseError> {
        match self.required(class, name)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ParseError::InvalidAttribute {
                class: class.to_string(),
                attribute: name.to_string(),
                value: other.to_string(),
                reason: "expected \"true\" or \"false\"".to_string(),
            }),
        }
    }

    /// An optional attribute, owned.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// `class(name=value,...)` over every non-class attribute, with
    /// delimiters in names and values escaped.
    pub fn canonical_key(&self) -> String {
        let mut key = KeyComponent(self.class().unwrap_or_default()).to_string();
        key.push('(');
        let parameters = self.iter().filter(|(name, _)| *name != CLASS);
        for (i, (name, value)) in parameters.enumerate() {
            if i > 0 {
                key.push(',');
            }
            let _ = write!(key, "{}={}", KeyComponent(name), KeyComponent(value));
        }
        key.push(')');
        key
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(pairs: I) -> Self {
        let mut attributes = Attributes::default();
        for (name, value) in pairs {
            attributes.insert(name, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_keys_independent_of_insertion_order() {
        let a = Attributes::new("word").with("word", "box").with("pos", "NN");
        let b: Attributes = [("pos", "NN"), ("class", "word"), ("word", "box")]
            .into_iter()
            .collect();

        assert_eq!(a.canonical_key(), "word(pos=NN,word=box)");
        assert_eq!(a, b);
    }

    #[test]
    fn it_keeps_keys_distinct_when_values_contain_delimiters() {
        let spliced = Attributes::new("word").with("word", "box,pos=NN");
        let separate = Attributes::new("word").with("word", "box").with("pos", "NN");

        assert_ne!(spliced.canonical_key(), separate.canonical_key());
        assert_eq!(spliced.canonical_key(), r"word(word=box\,pos\=NN)");
    }

    #[test]
    fn it_reports_missing_and_malformed_attributes() {
        let attributes = Attributes::new("object_is_unique").with("invert", "maybe");

        assert!(matches!(
            attributes.required("object_is_unique", "uid"),
            Err(ParseError::MissingAttribute { attribute, .. }) if attribute == "uid"
        ));
        assert!(matches!(
            attributes.required_bool("object_is_unique", "invert"),
            Err(ParseError::InvalidAttribute { value, .. }) if value == "maybe"
        ));
        assert!(matches!(
            attributes.expect_class("cv"),
            Err(ParseError::ClassMismatch { expected: "cv", found }) if found == "object_is_unique"
        ));
    }
}
