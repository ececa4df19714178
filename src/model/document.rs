//! Wire document exchanged with the backend.
//!
//! ```text
//! { "nodes": [ { "data": { "id": .., "type": .., "label": .., ...attrs } } ],
//!   "edges": [ { "data": { "id": .., "source": .., "target": .., "label": .. } } ] }
//! ```
//!
//! Both arrays are required. Anything else on an element (positions,
//! classes) is ignored.

use serde::{Deserialize, Serialize};

use super::{AttributeMap, Edge, EdgeId, Node, NodeId, UNKNOWN_TYPE};
use crate::{Error, Result};

/// `{ "data": T }` envelope around every element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element<T> {
    pub data: T,
}

/// Node payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: NodeId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub attributes: AttributeMap,
}

/// Edge payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The graph document returned by the upload, neighbor-fetch, and default
/// asset sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Element<NodeData>>,
    pub edges: Vec<Element<EdgeData>>,
}

impl GraphDocument {
    /// Parse a response body. A body that is not a graph document is
    /// reported as [`Error::IngestData`].
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::IngestData(e.to_string()))
    }

    /// Unwrap the envelopes into model values, applying wire defaults:
    /// missing label → id, missing type → [`UNKNOWN_TYPE`], missing edge
    /// id → [`EdgeId::synthesized`].
    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        let nodes = self.nodes.into_iter().map(|el| {
            let d = el.data;
            Node {
                label: d.label.unwrap_or_else(|| d.id.0.clone()),
                entity_type: d.entity_type.unwrap_or_else(|| UNKNOWN_TYPE.to_owned()),
                id: d.id,
                attributes: d.attributes,
            }
        }).collect();

        let edges = self.edges.into_iter().enumerate().map(|(i, el)| {
            let d = el.data;
            Edge {
                id: d.id.unwrap_or_else(|| EdgeId::synthesized(&d.source, &d.target, i)),
                source: d.source,
                target: d.target,
                label: d.label.unwrap_or_default(),
            }
        }).collect();

        (nodes, edges)
    }

    /// Wrap model values back into the wire shape.
    pub fn from_parts<'a>(
        nodes: impl IntoIterator<Item = &'a Node>,
        edges: impl IntoIterator<Item = &'a Edge>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| Element {
                data: NodeData {
                    id: n.id.clone(),
                    entity_type: Some(n.entity_type.clone()),
                    label: Some(n.label.clone()),
                    attributes: n.attributes.clone(),
                },
            }).collect(),
            edges: edges.into_iter().map(|e| Element {
                data: EdgeData {
                    id: Some(e.id.clone()),
                    source: e.source.clone(),
                    target: e.target.clone(),
                    label: Some(e.label.clone()),
                },
            }).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_parse_with_defaults() {
        let body = br#"{
            "nodes": [
                {"data": {"id": 1, "type": "IfcWall", "label": "Wall A", "Name": "Basic Wall"}},
                {"data": {"id": "2"}}
            ],
            "edges": [
                {"data": {"source": 1, "target": "2"}}
            ]
        }"#;
        let doc = GraphDocument::from_slice(body).unwrap();
        let (nodes, edges) = doc.into_parts();

        assert_eq!(nodes[0].id, NodeId::from("1"));
        assert_eq!(nodes[0].label, "Wall A");
        assert_eq!(nodes[0].get("Name"), Some(&Value::from("Basic Wall")));
        assert!(!nodes[0].attributes.contains_key("type"));
        assert_eq!(nodes[1].label, "2");
        assert_eq!(nodes[1].entity_type, UNKNOWN_TYPE);
        assert_eq!(edges[0].id.as_str(), "1->2#0");
    }

    #[test]
    fn test_missing_edges_is_ingest_data_error() {
        let err = GraphDocument::from_slice(br#"{"nodes": []}"#).unwrap_err();
        assert!(matches!(err, Error::IngestData(_)));
    }

    #[test]
    fn test_garbage_is_ingest_data_error() {
        let err = GraphDocument::from_slice(b"upload chunk 3 received").unwrap_err();
        assert!(matches!(err, Error::IngestData(_)));
    }
}
