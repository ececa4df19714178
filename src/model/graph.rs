//! Graph: an ordered node sequence plus an ordered edge sequence.

use serde::{Deserialize, Serialize};
use super::{Edge, Node};

/// A full graph snapshot.
///
/// Order is significant: the type filter admits nodes in this order, so
/// "first N of a type" means first N in `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
