use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{KeyComponent, LanguageError};

/// Symbol type for references to world objects.
pub const OBJECT: &str = "object";

/// Symbol type for spatial relations.
pub const SPATIAL_RELATION: &str = "spatial_relation";

/// Symbol type for "the most ..." style selections over a sort order.
pub const EXTREMUM: &str = "extremum";

/// Property naming the world object a symbol refers to.
pub const UID: &str = "uid";

/// Property of a spatial relation naming its signed axis (`+x`, `-y`, ...).
pub const AXIS: &str = "axis";

/// Property of an extremum naming the sort key it selects by.
pub const SORT_KEY: &str = "sort_key";

/// A candidate meaning for a phrase.
///
/// Symbols are plain values: a type and an ordered map of string
/// properties. Two symbols with the same type and properties are the same
/// symbol, and produce the same [`Symbol::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    /// The symbol type (`object`, `spatial_relation`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Symbol {
    /// A symbol of the given type with no properties.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    /// An `object` symbol referring to the world object `uid`.
    pub fn object(uid: impl Into<String>) -> Self {
        Symbol::new(OBJECT).with_property(UID, uid)
    }

    /// Builder-style helper that sets a property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// The world object this symbol refers to, if any.
    pub fn uid(&self) -> Option<&str> {
        self.property(UID)
    }

    /// Whether the symbol has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Canonical structural key, e.g. `object(uid=box1)`. Delimiters inside
    /// the type, names and values are escaped (see [`KeyComponent`]).
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parse a symbol from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LanguageError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", KeyComponent(&self.kind))?;
        for (i, (name, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", KeyComponent(name), KeyComponent(value))?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keys_by_type_and_sorted_properties() {
        let a = Symbol::new(SPATIAL_RELATION)
            .with_property("axis", "+x")
            .with_property("extrema", "max");
        let b = Symbol::new(SPATIAL_RELATION)
            .with_property("extrema", "max")
            .with_property("axis", "+x");

        assert_eq!(a.key(), "spatial_relation(axis=+x,extrema=max)");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Symbol::object("box1").key());
    }

    #[test]
    fn it_keeps_keys_distinct_when_values_contain_delimiters() {
        let spliced = Symbol::new(OBJECT).with_property("color", "red,uid=box1");
        let separate = Symbol::object("box1").with_property("color", "red");

        assert_ne!(spliced.key(), separate.key());
        assert_eq!(separate.key(), "object(color=red,uid=box1)");
        assert_eq!(spliced.key(), r"object(color=red\,uid\=box1)");
    }

    #[test]
    fn it_decodes_the_type_field() {
        let symbol = Symbol::from_json_str(r#"{"type":"object","properties":{"uid":"b1"}}"#).unwrap();

        assert!(symbol.is(OBJECT));
        assert_eq!(symbol.uid(), Some("b1"));
    }
}
