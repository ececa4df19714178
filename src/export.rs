//! View export: what is on screen right now, as data.
//!
//! ```text
//! RenderSurface → export_view()        → GraphDocument (same wire shape as uploads)
//!               → write_view_json()    → pretty JSON, nodes and edges sorted by id
//!               → write_view_summary() → one line per element, for logs and diffs
//! ```
//!
//! An exported view can be fed back through `Explorer::load_graph` to
//! reproduce it as a stand-alone graph.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::model::{AttributeMap, GraphDocument, NodeId, Value};
use crate::render::RenderSurface;
use crate::Result;

/// Read-out of one displayed node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub label: String,
    /// Sorted by key.
    pub attributes: AttributeMap,
    /// JSON kind of each attribute, for display beside its value.
    pub attribute_kinds: BTreeMap<String, &'static str>,
    /// Incident edges currently displayed.
    pub rendered_degree: usize,
}

/// Details for `id`, or `None` if it is not displayed.
pub fn node_details<S: RenderSurface + ?Sized>(surface: &S, id: &NodeId) -> Option<NodeDetails> {
    let node = surface.node(id)?;
    let rendered_degree = surface.edges().iter().filter(|e| e.touches(id)).count();
    Some(NodeDetails {
        id: node.id.clone(),
        entity_type: node.entity_type.clone(),
        label: node.label.clone(),
        attributes: node.attributes.clone(),
        attribute_kinds: node.attributes.iter().map(|(k, v)| (k.clone(), v.kind())).collect(),
        rendered_degree,
    })
}

/// The displayed subgraph as a document.
pub fn export_view<S: RenderSurface + ?Sized>(surface: &S) -> GraphDocument {
    let ids = surface.node_ids();
    let edges = surface.edges();
    GraphDocument::from_parts(ids.iter().filter_map(|id| surface.node(id)), &edges)
}

/// Write the displayed subgraph as pretty-printed JSON.
pub fn write_view_json<S: RenderSurface + ?Sized>(surface: &S, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &export_view(surface))?;
    writeln!(writer)?;
    Ok(())
}

/// Write a line-per-element text summary of the displayed subgraph.
pub fn write_view_summary<S: RenderSurface + ?Sized>(surface: &S, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "// Nodes: {}", surface.node_count())?;
    writeln!(writer, "// Edges: {}", surface.edge_count())?;

    for id in surface.node_ids() {
        let Some(node) = surface.node(&id) else { continue };
        let attrs = format_attributes(&node.attributes);
        write!(writer, "({}:{} '{}'", node.id, node.entity_type, escape(&node.label))?;
        if !attrs.is_empty() {
            write!(writer, " {{{attrs}}}")?;
        }
        writeln!(writer, ")")?;
    }

    for edge in surface.edges() {
        if edge.label.is_empty() {
            writeln!(writer, "({})-->({})", edge.source, edge.target)?;
        } else {
            writeln!(writer, "({})-[{}]->({})", edge.source, escape(&edge.label), edge.target)?;
        }
    }
    Ok(())
}

/// `key: value, ...` in key order.
fn format_attributes(attrs: &AttributeMap) -> String {
    attrs
        .iter()
        .map(|(key, value)| format!("{}: {}", key, format_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", escape(s)),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{}", f),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Map(m) => format!("{{{}}}", format_attributes(m)),
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "\\'")
}
