//! Export round-trip: displayed view → JSON → fresh session.
//!
//!   Session A → write_view_json() → bytes → Session B.load_graph()
//!
//! Session B, with every type toggled on, must show exactly what A showed.

use ifc_graph_explorer::export::{write_view_json, write_view_summary};
use ifc_graph_explorer::{
    Edge, EdgeId, Explorer, ExplorerConfig, GraphDocument, ManualScheduler, Node, NodeId,
    RenderState, RenderSurface, Value,
};
use pretty_assertions::assert_eq;

type Session = Explorer<RenderState, ManualScheduler>;

fn storey() -> GraphDocument {
    let nodes = vec![
        Node::new("storey", "IfcBuildingStorey").with_label("Level 1").with_attribute("Elevation", 0.0),
        Node::new("w1", "IfcWall").with_label("Wall 1").with_attribute("IsExternal", true),
        Node::new("w2", "IfcWall").with_label("Wall 2"),
        Node::new("d1", "IfcDoor").with_label("Door 1").with_attribute("Tag", 4711i64),
        Node::new("win", "IfcWindow"),
    ];
    let edges = vec![
        Edge::new("c1", "storey", "w1").with_label("IfcRelContainedInSpatialStructure"),
        Edge::new("c2", "storey", "w2").with_label("IfcRelContainedInSpatialStructure"),
        Edge::new("f1", "w1", "d1").with_label("IfcRelFillsElement"),
        Edge::new("f2", "w2", "win").with_label("IfcRelFillsElement"),
    ];
    GraphDocument::from_parts(&nodes, &edges)
}

fn view(explorer: &Session) -> (Vec<NodeId>, Vec<EdgeId>) {
    let surface = explorer.surface();
    (surface.node_ids(), surface.edges().into_iter().map(|e| e.id).collect())
}

// ============================================================================
// 1. JSON round-trip
// ============================================================================

#[test]
fn test_view_roundtrip_through_json() {
    let mut a = Explorer::in_memory(ExplorerConfig::default());
    a.load_graph(storey()).unwrap();
    a.toggle_type("IfcWall");
    a.expand(&NodeId::from("w1"));

    let mut json = Vec::new();
    write_view_json(a.surface(), &mut json).unwrap();

    let mut b = Explorer::in_memory(ExplorerConfig::default());
    let report = b.load_graph(GraphDocument::from_slice(&json).unwrap()).unwrap();
    assert_eq!(report.dropped_edges, 0);
    for entity_type in b.entity_types().to_vec() {
        b.toggle_type(&entity_type);
    }

    assert_eq!(view(&b), view(&a));

    let details = b.inspect(&NodeId::from("d1")).unwrap();
    assert_eq!(details.label, "Door 1");
    assert_eq!(details.attributes.get("Tag"), Some(&Value::Int(4711)));
    assert_eq!(details.attribute_kinds.get("Tag"), Some(&"number"));
}

#[test]
fn test_export_excludes_hidden_elements() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    explorer.load_graph(storey()).unwrap();
    explorer.toggle_type("IfcWall");

    let doc = explorer.export_view();
    let ids: Vec<&str> = doc.nodes.iter().map(|n| n.data.id.as_str()).collect();
    assert_eq!(ids, vec!["w1", "w2"]);
    assert!(doc.edges.is_empty());
}

// ============================================================================
// 2. Text summary
// ============================================================================

#[test]
fn test_summary_lists_view() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    explorer.load_graph(storey()).unwrap();
    explorer.toggle_type("IfcWall");
    explorer.toggle_type("IfcDoor");

    let mut out = Vec::new();
    write_view_summary(explorer.surface(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("// Nodes: 3"));
    assert!(text.contains("// Edges: 1"));
    assert!(text.contains("(w1:IfcWall 'Wall 1' {IsExternal: true})"));
    assert!(text.contains("(d1:IfcDoor 'Door 1' {Tag: 4711})"));
    assert!(text.contains("(w1)-[IfcRelFillsElement]->(d1)"));
}
