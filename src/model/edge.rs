//! Edge in the entity graph.

use serde::{Deserialize, Deserializer, Serialize};
use super::node::RawKey;
use super::NodeId;

/// Edge identifier. Same normalization rules as [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Id given to an edge the backend sent without one.
    pub fn synthesized(source: &NodeId, target: &NodeId, index: usize) -> Self {
        EdgeId(format!("{source}->{target}#{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self { EdgeId(s.to_owned()) }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self { EdgeId(s) }
}

impl<'de> Deserialize<'de> for EdgeId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        RawKey::deserialize(d).map(|k| EdgeId(k.into_string()))
    }
}

/// A (directed) edge between two nodes.
///
/// Only valid when both endpoints exist in the same graph snapshot; the
/// store drops invalid edges at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub label: String,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The "other" end of the edge from the given node.
    pub fn other_end(&self, from: &NodeId) -> Option<&NodeId> {
        if *from == self.source { Some(&self.target) }
        else if *from == self.target { Some(&self.source) }
        else { None }
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        self.source == *node || self.target == *node
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
