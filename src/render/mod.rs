//! # Rendering Surface
//!
//! The contract between the display synchronizer and whatever actually
//! draws the graph. The surface is the single source of truth for what is
//! currently shown; the synchronizer keeps no shadow copy and only ever
//! talks to it through this narrow command interface.
//!
//! ## Implementations
//!
//! | Surface | Module | Description |
//! |---------|--------|-------------|
//! | `RenderState` | `state` | Owned in-memory surface with position memory |

pub mod state;

use crate::layout::LayoutRequest;
use crate::model::*;

pub use state::{Bounds, LayoutEngine, Point, RenderState, RingSeed};

// ============================================================================
// RenderBatch
// ============================================================================

/// One atomic-looking update: a node-set change and its edge-set change.
///
/// Applied in the order edge removals → node removals → node additions →
/// edge additions, so no intermediate state holds a dangling edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderBatch {
    pub remove_edges: Vec<EdgeId>,
    pub remove_nodes: Vec<NodeId>,
    pub add_nodes: Vec<Node>,
    pub add_edges: Vec<Edge>,
}

impl RenderBatch {
    pub fn is_empty(&self) -> bool {
        self.remove_edges.is_empty()
            && self.remove_nodes.is_empty()
            && self.add_nodes.is_empty()
            && self.add_edges.is_empty()
    }
}

/// Displayed edges with an endpoint that is not displayed. Empty whenever
/// the surface is in a consistent state.
pub fn dangling_edges<S: RenderSurface + ?Sized>(surface: &S) -> Vec<EdgeId> {
    surface
        .edges()
        .into_iter()
        .filter(|e| !surface.contains_node(&e.source) || !surface.contains_node(&e.target))
        .map(|e| e.id)
        .collect()
}

// ============================================================================
// RenderSurface trait
// ============================================================================

/// Command interface over a live rendering surface.
///
/// Adds and removes are idempotent: adding something already shown or
/// removing something absent does nothing.
pub trait RenderSurface {
    fn contains_node(&self, id: &NodeId) -> bool;

    fn contains_edge(&self, id: &EdgeId) -> bool;

    /// A displayed node's data.
    fn node(&self, id: &NodeId) -> Option<&Node>;

    /// Ids of every displayed node, sorted.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Every displayed edge, sorted by id.
    fn edges(&self) -> Vec<Edge>;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn add_nodes(&mut self, nodes: Vec<Node>);

    fn remove_nodes(&mut self, ids: &[NodeId]);

    fn add_edges(&mut self, edges: Vec<Edge>);

    fn remove_edges(&mut self, ids: &[EdgeId]);

    /// Run the surface's layout algorithm.
    fn run_layout(&mut self, request: LayoutRequest);

    /// Apply a batch as one update.
    ///
    /// Default: issue the four commands in dangling-free order. Surfaces
    /// that can suspend redraws should override this and wrap the calls.
    fn apply(&mut self, batch: RenderBatch) {
        let RenderBatch { remove_edges, remove_nodes, add_nodes, add_edges } = batch;
        if !remove_edges.is_empty() {
            self.remove_edges(&remove_edges);
        }
        if !remove_nodes.is_empty() {
            self.remove_nodes(&remove_nodes);
        }
        if !add_nodes.is_empty() {
            self.add_nodes(add_nodes);
        }
        if !add_edges.is_empty() {
            self.add_edges(add_edges);
        }
    }

    /// Remove every node and edge.
    fn clear(&mut self) {
        let batch = RenderBatch {
            remove_edges: self.edges().into_iter().map(|e| e.id).collect(),
            remove_nodes: self.node_ids(),
            ..RenderBatch::default()
        };
        self.apply(batch);
    }

    /// Forget the current graph entirely before another one is loaded.
    ///
    /// Default: [`clear`](Self::clear). Surfaces that keep per-node state
    /// beyond the displayed elements must drop it here too.
    fn reset(&mut self) {
        self.clear();
    }
}
