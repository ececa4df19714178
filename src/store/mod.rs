//! # Graph Store
//!
//! Holds the canonical full graph and everything derived from it: the
//! entity-type universe and the lookup indexes the display layer reads.
//!
//! ## Contract
//!
//! - `set_graph()` replaces everything in one step; there are no partial
//!   updates and the stored graph is never mutated in place.
//! - Edges whose endpoints are not both present are dropped before the
//!   graph is stored. Dropping is a normalization, not a failure.
//! - Malformed input (duplicate node ids) is reported as
//!   [`Error::DuplicateNode`] and the previous contents are kept.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::model::*;
use crate::{Error, Result};

/// Indexes into `Graph::edges`, per node. Most IFC entities have a handful
/// of relations, so these rarely spill.
type EdgeSlots = SmallVec<[usize; 4]>;

/// The canonical full graph plus derived indexes.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: Graph,
    loaded: bool,
    /// Distinct node types, first-seen order.
    entity_types: Vec<String>,
    /// node id → position in `graph.nodes`
    node_index: HashMap<NodeId, usize>,
    /// entity type → positions in `graph.nodes`, graph order
    type_index: HashMap<String, Vec<usize>>,
    /// node id → positions in `graph.edges` touching it
    adjacency: HashMap<NodeId, EdgeSlots>,
    edge_index: HashMap<EdgeId, usize>,
    dropped_edges: usize,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Validate and store a new full graph, replacing any previous one.
    pub fn set_graph(&mut self, raw_nodes: Vec<Node>, raw_edges: Vec<Edge>) -> Result<&Graph> {
        let mut node_index = HashMap::with_capacity(raw_nodes.len());
        let mut type_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut entity_types = Vec::new();

        for (pos, node) in raw_nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), pos).is_some() {
                return Err(Error::DuplicateNode(node.id.clone()));
            }
            let slots = type_index.entry(node.entity_type.clone()).or_insert_with(|| {
                entity_types.push(node.entity_type.clone());
                Vec::new()
            });
            slots.push(pos);
        }

        let total_edges = raw_edges.len();
        let mut seen_edges = HashSet::with_capacity(total_edges);
        let edges: Vec<Edge> = raw_edges
            .into_iter()
            .filter(|e| node_index.contains_key(&e.source) && node_index.contains_key(&e.target))
            .filter(|e| seen_edges.insert(e.id.clone()))
            .collect();
        let dropped = total_edges - edges.len();
        if dropped > 0 {
            debug!(dropped, "dropped edges referencing absent nodes or repeating an id");
        }

        let mut adjacency: HashMap<NodeId, EdgeSlots> = HashMap::with_capacity(node_index.len());
        let mut edge_index = HashMap::with_capacity(edges.len());
        for (pos, edge) in edges.iter().enumerate() {
            edge_index.insert(edge.id.clone(), pos);
            adjacency.entry(edge.source.clone()).or_default().push(pos);
            if !edge.is_self_loop() {
                adjacency.entry(edge.target.clone()).or_default().push(pos);
            }
        }

        debug!(
            nodes = raw_nodes.len(),
            edges = edges.len(),
            types = entity_types.len(),
            "graph stored"
        );

        self.graph = Graph::new(raw_nodes, edges);
        self.loaded = true;
        self.entity_types = entity_types;
        self.node_index = node_index;
        self.type_index = type_index;
        self.adjacency = adjacency;
        self.edge_index = edge_index;
        self.dropped_edges = dropped;
        Ok(&self.graph)
    }

    /// Convenience over [`set_graph`](Self::set_graph) for a wire document.
    pub fn set_document(&mut self, doc: GraphDocument) -> Result<&Graph> {
        let (nodes, edges) = doc.into_parts();
        self.set_graph(nodes, edges)
    }

    /// Forget the graph and the entity-type universe.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True once a graph has been stored (the display's `Populated` state).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Distinct entity types in first-seen order.
    pub fn entity_types(&self) -> &[String] {
        &self.entity_types
    }

    /// Edges dropped by the last successful `set_graph`.
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&pos| &self.graph.nodes[pos])
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_index.get(id).map(|&pos| &self.graph.edges[pos])
    }

    /// Nodes of one entity type, in graph order.
    pub fn nodes_of_type<'a>(&'a self, entity_type: &str) -> impl Iterator<Item = &'a Node> + use<'a> {
        self.type_index
            .get(entity_type)
            .into_iter()
            .flatten()
            .map(|&pos| &self.graph.nodes[pos])
    }

    /// Every edge touching `id`, in graph order.
    pub fn incident_edges<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Edge> + use<'a> {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|&pos| &self.graph.edges[pos])
    }

    /// Number of edges touching `id` in the full graph.
    pub fn degree(&self, id: &NodeId) -> usize {
        self.adjacency.get(id).map_or(0, |slots| slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_door() -> (Vec<Node>, Vec<Edge>) {
        (
            vec![
                Node::new("1", "Wall"),
                Node::new("2", "Wall"),
                Node::new("3", "Door"),
            ],
            vec![Edge::new("e1", "1", "3"), Edge::new("e2", "2", "99")],
        )
    }

    #[test]
    fn test_dangling_edge_dropped() {
        let mut store = GraphStore::new();
        let (nodes, edges) = wall_door();
        let graph = store.set_graph(nodes, edges).unwrap();

        let ids: Vec<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1"]);
        assert_eq!(store.dropped_edges(), 1);
    }

    #[test]
    fn test_entity_types_first_seen_order() {
        let mut store = GraphStore::new();
        let nodes = vec![
            Node::new("a", "Slab"),
            Node::new("b", "Wall"),
            Node::new("c", "Slab"),
            Node::new("d", "Door"),
        ];
        store.set_graph(nodes, vec![]).unwrap();
        assert_eq!(store.entity_types(), &["Slab", "Wall", "Door"]);
    }

    #[test]
    fn test_duplicate_node_keeps_previous_graph() {
        let mut store = GraphStore::new();
        let (nodes, edges) = wall_door();
        store.set_graph(nodes, edges).unwrap();

        let err = store
            .set_graph(vec![Node::new("x", "Wall"), Node::new("x", "Door")], vec![])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(ref id) if id.as_str() == "x"));
        assert_eq!(store.graph().node_count(), 3);
        assert!(store.contains_node(&"3".into()));
    }

    #[test]
    fn test_replacement_is_wholesale() {
        let mut store = GraphStore::new();
        let (nodes, edges) = wall_door();
        store.set_graph(nodes, edges).unwrap();
        store.set_graph(vec![Node::new("z", "Beam")], vec![]).unwrap();

        assert_eq!(store.entity_types(), &["Beam"]);
        assert!(store.node(&"1".into()).is_none());
        assert_eq!(store.incident_edges(&"1".into()).count(), 0);
    }

    #[test]
    fn test_indexes() {
        let mut store = GraphStore::new();
        let nodes = vec![Node::new("a", "Wall"), Node::new("b", "Door"), Node::new("c", "Wall")];
        let edges = vec![
            Edge::new("ab", "a", "b"),
            Edge::new("bc", "b", "c"),
            Edge::new("aa", "a", "a"),
        ];
        store.set_graph(nodes, edges).unwrap();

        let walls: Vec<&str> = store.nodes_of_type("Wall").map(|n| n.id.as_str()).collect();
        assert_eq!(walls, vec!["a", "c"]);
        assert_eq!(store.degree(&"b".into()), 2);
        // self-loop counted once
        assert_eq!(store.degree(&"a".into()), 2);
        assert_eq!(store.edge(&"bc".into()).map(|e| e.target.as_str()), Some("c"));
    }

    #[test]
    fn test_clear() {
        let mut store = GraphStore::new();
        let (nodes, edges) = wall_door();
        store.set_graph(nodes, edges).unwrap();
        store.clear();
        assert!(!store.is_loaded());
        assert!(store.entity_types().is_empty());
        assert!(store.graph().is_empty());
    }
}
