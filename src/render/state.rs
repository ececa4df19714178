//! In-memory rendering surface.
//!
//! `RenderState` is the reference implementation of [`RenderSurface`]. It
//! owns the displayed nodes and edges, remembers the position of every node
//! it has ever laid out, and logs every layout pass so callers can see
//! which flags each mutation ran with.
//!
//! Positions survive removal: a node that leaves the view and comes back
//! (type toggled off then on, isolate then expand) lands where it was.
//! They do not survive [`RenderSurface::reset`], since ids are only
//! meaningful within one graph.

use std::f64::consts::PI;

use hashbrown::HashMap;
use tracing::warn;

use crate::layout::LayoutRequest;
use crate::model::*;
use super::{RenderBatch, RenderSurface};

const RING_RADIUS: f64 = 100.0;
const RING_STEP: f64 = 40.0;

/// A position on the drawing plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned viewport rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

/// The layout algorithm a surface runs. Consumed as a capability.
pub trait LayoutEngine: Send {
    /// Assign positions for `displayed`. Engines must leave positioned
    /// nodes alone unless `request.randomize` is set.
    fn layout(
        &mut self,
        positions: &mut HashMap<NodeId, Point>,
        displayed: &[NodeId],
        request: LayoutRequest,
    );
}

/// Minimal engine: seeds unpositioned nodes on a ring around the centroid
/// of the positioned ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingSeed;

impl LayoutEngine for RingSeed {
    fn layout(
        &mut self,
        positions: &mut HashMap<NodeId, Point>,
        displayed: &[NodeId],
        request: LayoutRequest,
    ) {
        if request.randomize {
            for id in displayed {
                positions.remove(id);
            }
        }

        let placed: Vec<Point> = displayed.iter().filter_map(|id| positions.get(id).copied()).collect();
        let centre = if placed.is_empty() {
            Point::default()
        } else {
            let n = placed.len() as f64;
            Point::new(
                placed.iter().map(|p| p.x).sum::<f64>() / n,
                placed.iter().map(|p| p.y).sum::<f64>() / n,
            )
        };

        let pending: Vec<&NodeId> = displayed.iter().filter(|id| !positions.contains_key(*id)).collect();
        if pending.is_empty() {
            return;
        }
        let radius = if placed.is_empty() { RING_RADIUS } else { RING_RADIUS + RING_STEP * (placed.len() as f64).sqrt() };
        let count = pending.len() as f64;
        for (i, id) in pending.into_iter().enumerate() {
            let angle = (i as f64) * 2.0 * PI / count;
            positions.insert(
                id.clone(),
                Point::new(centre.x + radius * angle.cos(), centre.y + radius * angle.sin()),
            );
        }
    }
}

/// Owned rendering state.
pub struct RenderState {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    positions: HashMap<NodeId, Point>,
    viewport: Option<Bounds>,
    layout_log: Vec<LayoutRequest>,
    batches: u64,
    engine: Box<dyn LayoutEngine>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderState")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("positions", &self.positions.len())
            .field("viewport", &self.viewport)
            .field("layout_passes", &self.layout_log.len())
            .finish()
    }
}

impl RenderState {
    pub fn new() -> Self {
        Self::with_engine(RingSeed)
    }

    pub fn with_engine(engine: impl LayoutEngine + 'static) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            positions: HashMap::new(),
            viewport: None,
            layout_log: Vec::new(),
            batches: 0,
            engine: Box::new(engine),
        }
    }

    /// Last known position of a node, displayed or not.
    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    /// Viewport set by the last fitting layout pass.
    pub fn viewport(&self) -> Option<Bounds> {
        self.viewport
    }

    /// Every layout pass run so far, oldest first.
    pub fn layout_log(&self) -> &[LayoutRequest] {
        &self.layout_log
    }

    /// Number of batches applied.
    pub fn batches_applied(&self) -> u64 {
        self.batches
    }

    fn fit_viewport(&mut self) {
        let mut points = self.nodes.keys().filter_map(|id| self.positions.get(id));
        let Some(first) = points.next() else {
            self.viewport = None;
            return;
        };
        let mut bounds = Bounds { min: *first, max: *first };
        for p in points {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        self.viewport = Some(bounds);
    }
}

impl RenderSurface for RenderState {
    fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn add_nodes(&mut self, nodes: Vec<Node>) {
        for node in nodes {
            self.nodes.entry(node.id.clone()).or_insert(node);
        }
    }

    /// Removing a node also removes its edges, as a drawing library would.
    fn remove_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.nodes.remove(id);
        }
        self.edges.retain(|_, e| self.nodes.contains_key(&e.source) && self.nodes.contains_key(&e.target));
    }

    fn add_edges(&mut self, edges: Vec<Edge>) {
        for edge in edges {
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                warn!(edge = %edge.id, "refusing edge with an undisplayed endpoint");
                continue;
            }
            self.edges.entry(edge.id.clone()).or_insert(edge);
        }
    }

    fn remove_edges(&mut self, ids: &[EdgeId]) {
        for id in ids {
            self.edges.remove(id);
        }
    }

    fn run_layout(&mut self, request: LayoutRequest) {
        let displayed = self.node_ids();
        self.engine.layout(&mut self.positions, &displayed, request);
        if request.fit {
            self.fit_viewport();
        }
        self.layout_log.push(request);
    }

    fn apply(&mut self, batch: RenderBatch) {
        let RenderBatch { remove_edges, remove_nodes, add_nodes, add_edges } = batch;
        self.remove_edges(&remove_edges);
        self.remove_nodes(&remove_nodes);
        self.add_nodes(add_nodes);
        self.add_edges(add_edges);
        self.batches += 1;
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.positions.clear();
        self.viewport = None;
        self.layout_log.clear();
    }
}
