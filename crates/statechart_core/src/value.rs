//! State values
//!
//! A state value is the position of an actor inside its state graph. Flat
//! machines produce a plain string (`"idle"`); compound and parallel states
//! produce a nested mapping (`{"editing": {"field": "focused"}}`).
//!
//! Nested mappings keep definition order, so the flattened dot path of a
//! value is deterministic.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Position of an actor in its state graph
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// An atomic state, named by its key
    Leaf(String),
    /// Active child values keyed by state key, in definition order
    Nested(IndexMap<String, StateValue>),
}

impl StateValue {
    /// Build a nested value from a dot path: `"a.b.c"` becomes `{a: {b: "c"}}`
    pub fn from_path(path: &str) -> Self {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().unwrap_or_default();
        segments
            .into_iter()
            .rev()
            .fold(StateValue::Leaf(last.to_string()), |child, key| {
                let mut map = IndexMap::with_capacity(1);
                map.insert(key.to_string(), child);
                StateValue::Nested(map)
            })
    }

    /// Flattened, dot-separated form of this value
    ///
    /// Walks the value depth-first in definition order, emitting every key on
    /// the way down. `{a: {b: "c"}}` flattens to `"a.b.c"`; a leaf flattens to
    /// its own name.
    pub fn state_path(&self) -> String {
        let mut segments = Vec::new();
        self.collect_segments(&mut segments);
        segments.join(".")
    }

    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            StateValue::Leaf(name) => out.push(name),
            StateValue::Nested(children) => {
                for (key, child) in children {
                    out.push(key);
                    child.collect_segments(out);
                }
            }
        }
    }

    /// Every root-to-leaf path in this value
    pub fn leaf_paths(&self) -> Vec<Vec<&str>> {
        match self {
            StateValue::Leaf(name) => vec![vec![name.as_str()]],
            StateValue::Nested(children) if children.is_empty() => vec![Vec::new()],
            StateValue::Nested(children) => children
                .iter()
                .flat_map(|(key, child)| {
                    child.leaf_paths().into_iter().map(move |mut path| {
                        path.insert(0, key.as_str());
                        path
                    })
                })
                .collect(),
        }
    }

    /// Check whether this value is in the state named by `path`
    ///
    /// `path` is a dot path that may stop at any depth, so `{a: {b: "c"}}`
    /// matches `"a"`, `"a.b"` and `"a.b.c"`.
    pub fn matches(&self, path: &str) -> bool {
        let wanted: Vec<&str> = path.split('.').collect();
        self.leaf_paths()
            .iter()
            .any(|leaf| leaf.len() >= wanted.len() && leaf[..wanted.len()] == wanted[..])
    }

    /// Returns true for flat (string) values
    pub fn is_leaf(&self) -> bool {
        matches!(self, StateValue::Leaf(_))
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state_path())
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        StateValue::Leaf(name.to_string())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        StateValue::Leaf(name)
    }
}

impl<K: Into<String>> FromIterator<(K, StateValue)> for StateValue {
    fn from_iter<I: IntoIterator<Item = (K, StateValue)>>(iter: I) -> Self {
        StateValue::Nested(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_path_is_unchanged() {
        assert_eq!(StateValue::from("idle").state_path(), "idle");
    }

    #[test]
    fn test_nested_path() {
        let inner: StateValue = [("b", StateValue::from("c"))].into_iter().collect();
        let value: StateValue = [("a", inner)].into_iter().collect();
        assert_eq!(value.state_path(), "a.b.c");
        assert_eq!(value, StateValue::from_path("a.b.c"));
    }

    #[test]
    fn test_parallel_path_keeps_definition_order() {
        let regions: StateValue = [
            ("bold", StateValue::from("off")),
            ("italic", StateValue::from("on")),
        ]
        .into_iter()
        .collect();
        let value: StateValue = [("format", regions)].into_iter().collect();

        assert_eq!(value.state_path(), "format.bold.off.italic.on");
        assert_eq!(value.to_string(), "format.bold.off.italic.on");
    }

    #[test]
    fn test_matches_prefixes() {
        let value = StateValue::from_path("editing.field.focused");
        assert!(value.matches("editing"));
        assert!(value.matches("editing.field"));
        assert!(value.matches("editing.field.focused"));
        assert!(!value.matches("editing.focused"));
        assert!(!value.matches("idle"));
    }

    #[test]
    fn test_serde_accepts_string_or_mapping() {
        let flat: StateValue = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(flat, StateValue::from("idle"));

        let nested: StateValue = serde_json::from_str(r#"{"a":{"b":"c"}}"#).unwrap();
        assert_eq!(nested.state_path(), "a.b.c");
    }
}
