//! Hierarchical value tree.
//!
//! The resolved output of a bind, and the evaluation context for default
//! expressions: dotted keys mirrored as nested scalar/mapping nodes.

use crate::schema::PATH_DELIMITER;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// A write disagreed with an earlier write about whether a path segment
/// holds a scalar or a nested mapping.
#[derive(Debug, Error)]
#[error("overlay hierarchical key: {path}")]
pub struct CollisionError {
    pub path: String,
}

/// One node of the value tree: a scalar leaf or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(String),
    Mapping(BTreeMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::mapping()
    }
}

impl Node {
    /// An empty mapping node.
    pub fn mapping() -> Self {
        Node::Mapping(BTreeMap::new())
    }

    /// A scalar leaf node.
    pub fn scalar(text: impl Into<String>) -> Self {
        Node::Scalar(text.into())
    }

    /// Write a scalar value at a dotted path, creating intermediate
    /// mappings as needed.
    ///
    /// Overwrites a prior scalar at the final segment. Fails if any segment
    /// already holds the other variant: a scalar in the middle of the
    /// path, or a mapping at the final segment.
    pub fn set(&mut self, path: &str, value: impl Into<String>) -> Result<(), CollisionError> {
        let value = value.into();
        let mut parts: Vec<&str> = path.split(PATH_DELIMITER).collect();
        let Some(leaf_key) = parts.pop() else {
            return Ok(());
        };

        let mut current = self;
        for part in parts {
            let map = match current {
                Node::Mapping(map) => map,
                Node::Scalar(_) => return Err(CollisionError { path: path.to_string() }),
            };
            current = map.entry(part.to_string()).or_insert_with(Node::mapping);
        }

        match current {
            Node::Mapping(map) => {
                if let Some(Node::Mapping(_)) = map.get(leaf_key) {
                    return Err(CollisionError { path: path.to_string() });
                }
                map.insert(leaf_key.to_string(), Node::Scalar(value));
                Ok(())
            }
            Node::Scalar(_) => Err(CollisionError { path: path.to_string() }),
        }
    }

    /// Look up the node at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for part in path.split(PATH_DELIMITER) {
            match current {
                Node::Mapping(map) => current = map.get(part)?,
                Node::Scalar(_) => return None,
            }
        }
        Some(current)
    }

    /// Look up the scalar text at a dotted path.
    pub fn scalar_at(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            Node::Scalar(text) => Some(text),
            Node::Mapping(_) => None,
        }
    }

    /// Convert to a JSON value (scalars become strings).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(text) => serde_json::Value::String(text.clone()),
            Node::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(text) => serializer.serialize_str(text),
            Node::Mapping(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
        }
    }
}
