use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use grounding_language::{OBJECT, Symbol};
use grounding_world::World;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{SearchError, SearchResult};

/// The values each property of each symbol type may take.
///
/// ```json
/// {
///   "spatial_relation": {"axis": ["+x", "-x", "+y", "-y"]},
///   "extremum": {"sort_key": ["max_x_axis", "min_x_axis"]}
/// }
/// ```
///
/// Object symbols come from the world, so an `object` entry is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolDictionary(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl SymbolDictionary {
    /// An empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `values` for `property` of symbols of type `kind`.
    pub fn with<I, S>(mut self, kind: &str, property: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(kind, property, values);
        self
    }

    /// Declare a symbol type that carries no properties.
    pub fn with_type(mut self, kind: &str) -> Self {
        self.0.entry(kind.to_string()).or_default();
        self
    }

    /// Add `values` to the allowed values of `property` of type `kind`.
    pub fn insert<I, S>(&mut self, kind: &str, property: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(kind.to_string())
            .or_default()
            .entry(property.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Properties and their values for `kind`.
    pub fn properties(&self, kind: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.0.get(kind)
    }

    /// Every symbol type with its properties, in type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Vec<String>>)> {
        self.0.iter().map(|(kind, properties)| (kind.as_str(), properties))
    }

    /// Parse a dictionary from JSON.
    pub fn from_json_str(json: &str) -> SearchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a dictionary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Every candidate symbol for one world.
#[derive(Debug, Clone, Default)]
pub struct SymbolSpace {
    symbols: Vec<Arc<Symbol>>,
}

impl SymbolSpace {
    /// Enumerate the candidates: one object symbol per world object in UID
    /// order, then for each other dictionary type (in type order) every
    /// combination of its property values, the last property varying
    /// fastest. A property with no allowed values yields no symbols of its
    /// type.
    pub fn new(world: &World, dictionary: &SymbolDictionary) -> Self {
        let mut symbols: Vec<Arc<Symbol>> = world
            .objects()
            .map(|object| Arc::new(Symbol::object(object.uid.clone())))
            .collect();

        for (kind, properties) in dictionary.iter().filter(|(kind, _)| *kind != OBJECT) {
            let before = symbols.len();
            if properties.is_empty() {
                symbols.push(Arc::new(Symbol::new(kind)));
            } else {
                for values in properties
                    .values()
                    .map(|values| values.iter())
                    .multi_cartesian_product()
                {
                    let symbol = properties
                        .keys()
                        .zip(values)
                        .fold(Symbol::new(kind), |symbol, (name, value)| {
                            symbol.with_property(name.as_str(), value.as_str())
                        });
                    symbols.push(Arc::new(symbol));
                }
            }
            tracing::trace!(kind, count = symbols.len() - before, "enumerated symbols");
        }

        tracing::debug!(symbols = symbols.len(), "built symbol space");
        Self { symbols }
    }

    /// A space over exactly `symbols`.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Arc::new).collect(),
        }
    }

    /// The candidates in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Symbol>> {
        self.symbols.iter()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounding_language::{AXIS, SPATIAL_RELATION};
    use grounding_world::Object;
    use pretty_assertions::assert_eq;

    fn keys(space: &SymbolSpace) -> Vec<String> {
        space.iter().map(|symbol| symbol.key()).collect()
    }

    #[test]
    fn it_enumerates_objects_then_property_combinations() {
        let world: World = [Object::new("b"), Object::new("a")].into_iter().collect();
        let dictionary = SymbolDictionary::new()
            .with(SPATIAL_RELATION, AXIS, ["+x", "-x"])
            .with(SPATIAL_RELATION, "frame", ["world", "robot"])
            .with(OBJECT, "color", ["red"])
            .with_type("region");

        let space = SymbolSpace::new(&world, &dictionary);

        let expected = vec![
            Symbol::object("a"),
            Symbol::object("b"),
            Symbol::new("region"),
            Symbol::new(SPATIAL_RELATION)
                .with_property(AXIS, "+x")
                .with_property("frame", "world"),
            Symbol::new(SPATIAL_RELATION)
                .with_property(AXIS, "+x")
                .with_property("frame", "robot"),
            Symbol::new(SPATIAL_RELATION)
                .with_property(AXIS, "-x")
                .with_property("frame", "world"),
            Symbol::new(SPATIAL_RELATION)
                .with_property(AXIS, "-x")
                .with_property("frame", "robot"),
        ];
        assert_eq!(
            keys(&space),
            expected.iter().map(Symbol::key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn it_skips_types_with_an_empty_value_list() {
        let dictionary = SymbolDictionary::new()
            .with(SPATIAL_RELATION, AXIS, ["+x"])
            .with(SPATIAL_RELATION, "frame", Vec::<String>::new());

        let space = SymbolSpace::new(&World::new(), &dictionary);

        assert!(space.is_empty());
    }

    #[test]
    fn it_reads_dictionaries_from_json() {
        let dictionary =
            SymbolDictionary::from_json_str(r#"{"extremum": {"sort_key": ["max_x_axis"]}}"#)
                .unwrap();

        assert_eq!(
            dictionary.properties("extremum").unwrap()["sort_key"],
            vec!["max_x_axis".to_string()]
        );
    }
}
