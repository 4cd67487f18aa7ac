use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{KeyComponent, LanguageError, Symbol};

/// One word of a phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Surface text.
    pub text: String,
    /// Part-of-speech tag, when the parser supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
}

impl Word {
    /// A word with no part-of-speech tag.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: None,
        }
    }

    /// A word tagged with its part of speech.
    pub fn tagged(text: impl Into<String>, pos: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: Some(pos.into()),
        }
    }
}

/// An edge from a language variable to one of its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Optional edge label (`nmod`, `obj`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The child phrase.
    pub child: LanguageVariable,
}

/// A node of a parsed utterance.
///
/// The parser produces the type, words, roles and children. The search
/// driver additionally attaches `groundings`: the symbols it has decided a
/// node refers to. Groundings never take part in [`LanguageVariable::key`]
/// and are not serialized, since they are an inference result rather than
/// part of the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageVariable {
    /// Phrase type (`NP`, `PP`, `VP`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Words spanned by this node.
    #[serde(default)]
    pub words: Vec<Word>,
    /// Ordered child connections.
    #[serde(default)]
    pub children: Vec<Connection>,
    /// Role annotations, role type to value.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    /// Symbols this node has been grounded to.
    #[serde(skip)]
    pub groundings: Vec<Arc<Symbol>>,
}

impl LanguageVariable {
    /// A node with no words, children or roles.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            words: Vec::new(),
            children: Vec::new(),
            roles: BTreeMap::new(),
            groundings: Vec::new(),
        }
    }

    /// Builder-style helper that appends whitespace-separated untagged words.
    pub fn with_text(mut self, text: &str) -> Self {
        self.words.extend(text.split_whitespace().map(Word::new));
        self
    }

    /// Builder-style helper that appends one word.
    pub fn with_word(mut self, word: Word) -> Self {
        self.words.push(word);
        self
    }

    /// Builder-style helper that appends an unlabelled child.
    pub fn with_child(self, child: LanguageVariable) -> Self {
        self.with_connection(None, child)
    }

    /// Builder-style helper that appends a child under an edge label.
    pub fn with_labelled_child(self, label: impl Into<String>, child: LanguageVariable) -> Self {
        self.with_connection(Some(label.into()), child)
    }

    fn with_connection(mut self, label: Option<String>, child: LanguageVariable) -> Self {
        self.children.push(Connection { label, child });
        self
    }

    /// Builder-style helper that sets a role annotation.
    pub fn with_role(mut self, role_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.roles.insert(role_type.into(), value.into());
        self
    }

    /// Look up a role annotation.
    pub fn role(&self, role_type: &str) -> Option<&str> {
        self.roles.get(role_type).map(String::as_str)
    }

    /// The words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Children reachable through `label`, or every child when `label` is
    /// `None`.
    pub fn children_labelled<'a>(
        &'a self,
        label: Option<&'a str>,
    ) -> impl Iterator<Item = &'a LanguageVariable> + 'a {
        self.children
            .iter()
            .filter(move |connection| label.is_none() || connection.label.as_deref() == label)
            .map(|connection| &connection.child)
    }

    /// Groundings of the children reachable through `label`.
    pub fn child_groundings<'a>(
        &'a self,
        label: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.children_labelled(label)
            .flat_map(|child| child.groundings.iter().map(Arc::as_ref))
    }

    /// A copy of this node whose children carry the given groundings, one
    /// entry per child in order.
    pub fn with_child_groundings(
        &self,
        groundings: &[Vec<Arc<Symbol>>],
    ) -> Result<LanguageVariable, LanguageError> {
        if groundings.len() != self.children.len() {
            return Err(LanguageError::ChildCount {
                expected: self.children.len(),
                found: groundings.len(),
            });
        }

        let mut grounded = self.clone();
        for (connection, symbols) in grounded.children.iter_mut().zip(groundings) {
            connection.child.groundings = symbols.clone();
        }
        Ok(grounded)
    }

    /// Canonical structural key covering type, words, roles and the keys of
    /// every child. Groundings are not part of the key.
    pub fn key(&self) -> String {
        let mut key = String::new();
        self.write_key(&mut key);
        key
    }

    fn write_key(&self, key: &mut String) {
        let _ = write!(key, "{}[", KeyComponent(&self.kind));
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                key.push(' ');
            }
            let _ = write!(key, "{}", KeyComponent(&word.text));
            if let Some(pos) = &word.pos {
                let _ = write!(key, "/{}", KeyComponent(pos));
            }
        }
        key.push(']');
        if !self.roles.is_empty() {
            key.push('{');
            for (i, (role_type, value)) in self.roles.iter().enumerate() {
                if i > 0 {
                    key.push(',');
                }
                let _ = write!(key, "{}={}", KeyComponent(role_type), KeyComponent(value));
            }
            key.push('}');
        }
        if !self.children.is_empty() {
            key.push('(');
            for (i, connection) in self.children.iter().enumerate() {
                if i > 0 {
                    key.push(',');
                }
                if let Some(label) = &connection.label {
                    let _ = write!(key, "{}:", KeyComponent(label));
                }
                connection.child.write_key(key);
            }
            key.push(')');
        }
    }

    /// Number of nodes in the tree rooted here.
    pub fn size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|connection| connection.child.size())
            .sum::<usize>()
    }

    /// Parse a language variable tree from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LanguageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the tree (without groundings) to JSON.
    pub fn to_json_string(&self) -> Result<String, LanguageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
