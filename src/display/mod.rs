//! # Display Synchronizer
//!
//! Turns high-level intents into minimal add/remove batches against a
//! [`RenderSurface`]. The surface is read for "what is shown"; the store is
//! read for "what exists".
//!
//! ## Intents
//!
//! | Intent | Diff | Layout |
//! |--------|------|--------|
//! | `toggle_type` on | admit ≤ cap new nodes of the type, add their edges | incremental |
//! | `toggle_type` off | drop every shown node of the type and its edges | incremental |
//! | `set_display_cap` | full re-derivation from the active types | incremental |
//! | `reset_view` | re-derivation with the default cap, selection cleared | fit |
//! | `expand` | add missing neighbours, then connecting edges | incremental |
//! | `isolate` | drop every other node and every edge | incremental |
//!
//! ## Edge admission
//!
//! An edge is shown only if both endpoints are shown. Every batch built
//! here preserves that, and the surface applies batches in dangling-free
//! order.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::{LayoutPolicy, LayoutRequest, MutationKind};
use crate::model::*;
use crate::render::{RenderBatch, RenderSurface};
use crate::store::GraphStore;
use crate::{Error, Result};

/// How the display cap bounds a type's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapPolicy {
    /// The cap bounds each active type on toggle-on and on re-derivation.
    #[default]
    PerType,
    /// The cap bounds only toggle-on admission; re-derivation shows every
    /// node of every active type.
    PerToggle,
}

/// What one intent did to the surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationSummary {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    /// Nodes that were shown before and are not shown now.
    pub removed_nodes: Vec<NodeId>,
    /// Layout pass run afterwards; `None` when nothing changed.
    pub layout: Option<LayoutRequest>,
}

impl MutationSummary {
    pub fn nodes_removed(&self) -> usize {
        self.removed_nodes.len()
    }

    pub fn is_noop(&self) -> bool {
        self.layout.is_none()
    }
}

/// Session display state plus the reconciliation algorithms.
#[derive(Debug, Clone)]
pub struct DisplaySync {
    /// Active entity types, activation order.
    active_types: Vec<String>,
    cap: usize,
    default_cap: usize,
    cap_policy: CapPolicy,
    selected: Option<NodeId>,
    layout: LayoutPolicy,
}

impl DisplaySync {
    /// `default_cap` of zero is raised to one.
    pub fn new(default_cap: usize, cap_policy: CapPolicy) -> Self {
        let default_cap = default_cap.max(1);
        Self {
            active_types: Vec::new(),
            cap: default_cap,
            default_cap,
            cap_policy,
            selected: None,
            layout: LayoutPolicy,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn active_types(&self) -> &[String] {
        &self.active_types
    }

    pub fn is_active(&self, entity_type: &str) -> bool {
        self.active_types.iter().any(|t| t == entity_type)
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn default_cap(&self) -> usize {
        self.default_cap
    }

    pub fn cap_policy(&self) -> CapPolicy {
        self.cap_policy
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Back to the initial session state (re-upload).
    pub fn reset_session(&mut self) {
        self.active_types.clear();
        self.selected = None;
        self.cap = self.default_cap;
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select a shown node. Selecting anything else is rejected and the
    /// previous selection is kept.
    pub fn select_node<S: RenderSurface + ?Sized>(&mut self, surface: &S, id: &NodeId) -> Result<()> {
        if !surface.contains_node(id) {
            return Err(Error::NodeNotDisplayed(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn sync_selection<S: RenderSurface + ?Sized>(&mut self, surface: &S) {
        if self.selected.as_ref().is_some_and(|id| !surface.contains_node(id)) {
            debug!(node = ?self.selected, "selected node left the view");
            self.selected = None;
        }
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Flip `entity_type` in the active set and reconcile the surface.
    pub fn toggle_type<S: RenderSurface + ?Sized>(
        &mut self,
        store: &GraphStore,
        surface: &mut S,
        entity_type: &str,
    ) -> MutationSummary {
        if !store.is_loaded() || !store.entity_types().iter().any(|t| t == entity_type) {
            debug!(entity_type, "toggle of unknown type ignored");
            return MutationSummary::default();
        }

        let batch = if let Some(pos) = self.active_types.iter().position(|t| t == entity_type) {
            self.active_types.remove(pos);
            Self::type_off_batch(surface, entity_type)
        } else {
            self.active_types.push(entity_type.to_owned());
            Self::type_on_batch(store, surface, entity_type, self.cap)
        };
        self.commit(surface, batch, MutationKind::ToggleType)
    }

    /// Change the cap and re-derive the whole display from the active types.
    pub fn set_display_cap<S: RenderSurface + ?Sized>(
        &mut self,
        store: &GraphStore,
        surface: &mut S,
        cap: usize,
    ) -> Result<MutationSummary> {
        if cap == 0 {
            return Err(Error::InvalidCap(cap));
        }
        self.cap = cap;
        Ok(self.rederive(store, surface, MutationKind::SetCap))
    }

    /// Re-derive with the default cap and drop the selection.
    pub fn reset_view<S: RenderSurface + ?Sized>(
        &mut self,
        store: &GraphStore,
        surface: &mut S,
    ) -> MutationSummary {
        self.cap = self.default_cap;
        self.selected = None;
        self.rederive(store, surface, MutationKind::ResetView)
    }

    /// Reveal the first-degree neighbourhood of a shown node from the full
    /// graph. Ignores the active types and the cap.
    pub fn expand<S: RenderSurface + ?Sized>(
        &mut self,
        store: &GraphStore,
        surface: &mut S,
        id: &NodeId,
    ) -> MutationSummary {
        if !surface.contains_node(id) {
            debug!(node = %id, "expand of undisplayed node ignored");
            return MutationSummary::default();
        }
        let batch = Self::expand_batch(surface, id, store.incident_edges(id), |n| store.node(n));
        self.commit(surface, batch, MutationKind::Expand)
    }

    /// Expand against a neighbourhood fetched from elsewhere (the full graph
    /// is not held locally). Only edges touching `id` are considered.
    pub fn expand_with<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        id: &NodeId,
        neighbourhood: GraphDocument,
    ) -> MutationSummary {
        if !surface.contains_node(id) {
            debug!(node = %id, "expand of undisplayed node ignored");
            return MutationSummary::default();
        }
        let (nodes, edges) = neighbourhood.into_parts();
        let fetched: HashMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        let batch = Self::expand_batch(
            surface,
            id,
            edges.iter().filter(|e| e.touches(id)),
            |n| fetched.get(n),
        );
        self.commit(surface, batch, MutationKind::Expand)
    }

    /// Reduce the display to `id` alone, with no edges.
    pub fn isolate<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, id: &NodeId) -> MutationSummary {
        if !surface.contains_node(id) {
            debug!(node = %id, "isolate of undisplayed node ignored");
            return MutationSummary::default();
        }
        let batch = RenderBatch {
            remove_edges: surface.edges().into_iter().map(|e| e.id).collect(),
            remove_nodes: surface.node_ids().into_iter().filter(|n| n != id).collect(),
            ..RenderBatch::default()
        };
        self.commit(surface, batch, MutationKind::Isolate)
    }

    /// Empty the surface and re-frame it for a freshly loaded graph.
    pub fn initial_load<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> MutationSummary {
        let batch = RenderBatch {
            remove_edges: surface.edges().into_iter().map(|e| e.id).collect(),
            remove_nodes: surface.node_ids(),
            ..RenderBatch::default()
        };
        let mut summary = self.commit(surface, batch, MutationKind::InitialLoad);
        if summary.layout.is_none() {
            let request = self.layout.request_for(MutationKind::InitialLoad);
            surface.run_layout(request);
            summary.layout = Some(request);
        }
        summary
    }

    // ========================================================================
    // Batch builders
    // ========================================================================

    fn type_on_batch<S: RenderSurface + ?Sized>(
        store: &GraphStore,
        surface: &S,
        entity_type: &str,
        cap: usize,
    ) -> RenderBatch {
        let admitted: Vec<Node> = store
            .nodes_of_type(entity_type)
            .filter(|n| !surface.contains_node(&n.id))
            .take(cap)
            .cloned()
            .collect();
        let add_edges = {
            let admitted_ids: HashSet<&NodeId> = admitted.iter().map(|n| &n.id).collect();
            let shown = |id: &NodeId| surface.contains_node(id) || admitted_ids.contains(id);
            let mut seen = HashSet::new();
            let mut add_edges = Vec::new();
            for node in &admitted {
                for edge in store.incident_edges(&node.id) {
                    if shown(&edge.source)
                        && shown(&edge.target)
                        && !surface.contains_edge(&edge.id)
                        && seen.insert(&edge.id)
                    {
                        add_edges.push(edge.clone());
                    }
                }
            }
            add_edges
        };

        RenderBatch { add_nodes: admitted, add_edges, ..RenderBatch::default() }
    }

    fn type_off_batch<S: RenderSurface + ?Sized>(surface: &S, entity_type: &str) -> RenderBatch {
        let remove_nodes: Vec<NodeId> = surface
            .node_ids()
            .into_iter()
            .filter(|id| surface.node(id).is_some_and(|n| n.is_type(entity_type)))
            .collect();
        let remove_edges = Self::dangling_after(surface, &remove_nodes.iter().collect());
        RenderBatch {
            remove_edges,
            remove_nodes,
            ..RenderBatch::default()
        }
    }

    /// Shown edges that would dangle once `removed` is gone.
    fn dangling_after<S: RenderSurface + ?Sized>(surface: &S, removed: &HashSet<&NodeId>) -> Vec<EdgeId> {
        surface
            .edges()
            .into_iter()
            .filter(|e| {
                let gone = |n: &NodeId| removed.contains(n) || !surface.contains_node(n);
                gone(&e.source) || gone(&e.target)
            })
            .map(|e| e.id)
            .collect()
    }

    fn expand_batch<'g, S, I, F>(surface: &S, id: &NodeId, touching: I, lookup: F) -> RenderBatch
    where
        S: RenderSurface + ?Sized,
        I: IntoIterator<Item = &'g Edge>,
        F: Fn(&NodeId) -> Option<&'g Node>,
    {
        let touching: Vec<&Edge> = touching.into_iter().collect();

        let mut add_nodes: Vec<Node> = Vec::new();
        let mut queued: HashSet<NodeId> = HashSet::new();
        for edge in &touching {
            let Some(other) = edge.other_end(id) else { continue };
            if surface.contains_node(other) || queued.contains(other) {
                continue;
            }
            match lookup(other) {
                Some(node) => {
                    queued.insert(other.clone());
                    add_nodes.push(node.clone());
                }
                None => warn!(edge = %edge.id, node = %other, "neighbour missing, edge skipped"),
            }
        }

        let mut seen = HashSet::new();
        let mut add_edges = Vec::new();
        for edge in touching {
            if surface.contains_edge(&edge.id) || !seen.insert(edge.id.clone()) {
                continue;
            }
            let shown = |n: &NodeId| surface.contains_node(n) || queued.contains(n);
            if shown(&edge.source) && shown(&edge.target) {
                add_edges.push(edge.clone());
            }
        }

        RenderBatch { add_nodes, add_edges, ..RenderBatch::default() }
    }

    /// Everything the active types call for, rebuilt from scratch.
    fn rederive<S: RenderSurface + ?Sized>(
        &mut self,
        store: &GraphStore,
        surface: &mut S,
        kind: MutationKind,
    ) -> MutationSummary {
        let per_type = match self.cap_policy {
            CapPolicy::PerType => self.cap,
            CapPolicy::PerToggle => usize::MAX,
        };
        let mut desired: Vec<Node> = Vec::new();
        for entity_type in store.entity_types() {
            if self.is_active(entity_type) {
                desired.extend(store.nodes_of_type(entity_type).take(per_type).cloned());
            }
        }
        let desired_edges: Vec<Edge> = {
            let desired_ids: HashSet<&NodeId> = desired.iter().map(|n| &n.id).collect();
            store
                .graph()
                .edges
                .iter()
                .filter(|e| desired_ids.contains(&e.source) && desired_ids.contains(&e.target))
                .cloned()
                .collect()
        };

        let batch = RenderBatch {
            remove_edges: surface.edges().into_iter().map(|e| e.id).collect(),
            remove_nodes: surface.node_ids(),
            add_nodes: desired,
            add_edges: desired_edges,
        };
        self.commit(surface, batch, kind)
    }

    // ========================================================================
    // Commit
    // ========================================================================

    fn commit<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        batch: RenderBatch,
        kind: MutationKind,
    ) -> MutationSummary {
        if batch.is_empty() {
            return MutationSummary::default();
        }

        let removed_nodes: Vec<NodeId> = {
            let re_added: HashSet<&NodeId> = batch.add_nodes.iter().map(|n| &n.id).collect();
            batch
                .remove_nodes
                .iter()
                .filter(|id| surface.contains_node(id) && !re_added.contains(id))
                .cloned()
                .collect()
        };
        let nodes_added = batch.add_nodes.iter().filter(|n| !surface.contains_node(&n.id)).count();
        let edges_removed = {
            let re_added: HashSet<&EdgeId> = batch.add_edges.iter().map(|e| &e.id).collect();
            batch
                .remove_edges
                .iter()
                .filter(|id| surface.contains_edge(id) && !re_added.contains(id))
                .count()
        };
        let edges_added = batch.add_edges.iter().filter(|e| !surface.contains_edge(&e.id)).count();

        surface.apply(batch);
        let request = self.layout.request_for(kind);
        surface.run_layout(request);
        self.sync_selection(surface);

        debug!(
            ?kind,
            nodes_added,
            nodes_removed = removed_nodes.len(),
            edges_added,
            edges_removed,
            "display updated"
        );

        MutationSummary {
            nodes_added,
            edges_added,
            edges_removed,
            removed_nodes,
            layout: Some(request),
        }
    }
}
