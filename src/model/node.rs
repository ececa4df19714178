//! Node in the entity graph.

use serde::{Deserialize, Deserializer, Serialize};
use super::{AttributeMap, Value};

/// Entity type given to nodes whose `type` key is missing on the wire.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Node identifier as issued by the backend.
///
/// The backend may emit ids as JSON strings or numbers; both normalize to
/// the string form, so `1` and `"1"` name the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { NodeId(s.to_owned()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { NodeId(s) }
}

impl From<i64> for NodeId {
    fn from(v: i64) -> Self { NodeId(v.to_string()) }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        RawKey::deserialize(d).map(|k| NodeId(k.into_string()))
    }
}

/// Wire-level identifier: string or number.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawKey {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl RawKey {
    pub(crate) fn into_string(self) -> String {
        match self {
            RawKey::Str(s) => s,
            RawKey::Int(i) => i.to_string(),
            RawKey::UInt(u) => u.to_string(),
            RawKey::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
            RawKey::Float(f) => f.to_string(),
        }
    }
}

/// A node of the entity graph. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Entity type (e.g. `"IfcWall"`), the unit the type filter works on.
    #[serde(rename = "type")]
    pub entity_type: String,
    pub label: String,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, entity_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.0.clone(),
            id,
            entity_type: entity_type.into(),
            attributes: AttributeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merge `(key, value)` pairs into the attributes.
    pub fn with_attributes<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.attributes.extend(super::attribute_map::from_pairs(pairs));
        self
    }

    pub fn is_type(&self, entity_type: &str) -> bool {
        self.entity_type == entity_type
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids_agree() {
        let a: NodeId = serde_json::from_str("1").unwrap();
        let b: NodeId = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(a, b);
        let c: NodeId = serde_json::from_str("7.0").unwrap();
        assert_eq!(c, NodeId::from("7"));
    }

    #[test]
    fn test_label_defaults_to_id() {
        let n = Node::new("wall-1", "IfcWall");
        assert_eq!(n.label, "wall-1");
        assert!(n.is_type("IfcWall"));
    }

    #[test]
    fn test_with_attributes() {
        let n = Node::new("d1", "IfcDoor")
            .with_attribute("Tag", 12)
            .with_attributes([("OverallWidth", 0.9), ("OverallHeight", 2.1)]);
        assert_eq!(n.attributes.keys().collect::<Vec<_>>(), vec!["OverallHeight", "OverallWidth", "Tag"]);
        assert_eq!(n.get("OverallWidth"), Some(&Value::Float(0.9)));
    }
}
