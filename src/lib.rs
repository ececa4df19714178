//! # ifc-graph-explorer: Incremental display engine for building-model graphs
//!
//! Loads the entity graph extracted from an IFC building model and keeps a
//! rendered subset of it in sync with what the user asked to see, without
//! ever redrawing from scratch.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `RenderSurface`, `UploadTransport`, `NeighborSource`
//!    and `Scheduler` are the contracts with the outside world
//! 2. **One store, one truth**: the full graph is replaced wholesale, never patched
//! 3. **Diffs, not redraws**: every intent becomes one minimal batch
//! 4. **No dangling edges**: an edge is shown only with both endpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ifc_graph_explorer::{Explorer, ExplorerConfig, SourceFile, UploadPipeline};
//! use ifc_graph_explorer::ingest::MemoryTransport;
//!
//! # async fn example() -> ifc_graph_explorer::Result<()> {
//! let mut explorer = Explorer::in_memory(ExplorerConfig::default());
//! let pipeline = UploadPipeline::new(MemoryTransport::echo()).with_chunk_size(1 << 20);
//!
//! let file = SourceFile::from_path("model.json")?;
//! let report = explorer.upload(&pipeline, &file, |p| println!("{}%", p.percent())).await?;
//! println!("{} nodes, {} edges", report.node_count, report.edge_count);
//!
//! explorer.toggle_type("IfcWall");
//! explorer.set_display_cap(20)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Transports
//!
//! | Transport | Feature | Description |
//! |-----------|---------|-------------|
//! | Memory | (default) | In-process backend for testing/embedding |
//! | HTTP | `http` | reqwest client against a remote graph backend |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod store;
pub mod ingest;
pub mod render;
pub mod layout;
pub mod display;
pub mod hover;
pub mod config;
pub mod export;

use std::path::Path;

use tracing::{error, info, warn};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Node, NodeId, Edge, EdgeId, Value, AttributeMap,
    Graph, GraphDocument, UNKNOWN_TYPE,
};

pub use store::GraphStore;

pub use ingest::{
    ChunkMeta, ChunkPlan, IngestReport, NeighborSource, Progress,
    SourceFile, TransportMode, UploadPipeline, UploadTransport,
};

pub use render::{RenderBatch, RenderState, RenderSurface};
pub use layout::{LayoutRequest, MutationKind};
pub use display::{CapPolicy, DisplaySync, MutationSummary};
pub use hover::{HoverCoordinator, HoverEffect, HoverPhase, ManualScheduler, Scheduler, TimerHandle};
pub use config::{ExplorerConfig, HoverTiming};
pub use export::NodeDetails;

// ============================================================================
// Explorer session
// ============================================================================

/// One exploration session: the store, the display state, the surface it
/// drives, and the hover popup slot.
///
/// Intents that change the surface return a [`MutationSummary`]. Popup
/// effects caused by those changes (a removed node losing its popup) are
/// queued and handed out by [`take_hover_effects`](Self::take_hover_effects).
#[derive(Debug)]
pub struct Explorer<S: RenderSurface, C: Scheduler> {
    config: ExplorerConfig,
    store: GraphStore,
    display: DisplaySync,
    surface: S,
    hover: HoverCoordinator<C>,
    loading: bool,
    progress: Option<Progress>,
    hover_effects: Vec<HoverEffect>,
}

/// Headless session for tests and embedding.
impl Explorer<RenderState, ManualScheduler> {
    pub fn in_memory(config: ExplorerConfig) -> Self {
        Self::new(RenderState::new(), ManualScheduler::new(), config)
    }
}

impl<S: RenderSurface, C: Scheduler> Explorer<S, C> {
    pub fn new(surface: S, scheduler: C, config: ExplorerConfig) -> Self {
        Self {
            display: DisplaySync::new(config.default_cap, config.cap_policy),
            hover: HoverCoordinator::new(scheduler, config.hover),
            config,
            store: GraphStore::new(),
            surface,
            loading: false,
            progress: None,
            hover_effects: Vec::new(),
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Upload `file` and show the resulting graph.
    ///
    /// Everything from the previous graph is cleared before the first chunk
    /// is sent, so a failed upload leaves the session graph-less.
    pub async fn upload<T, P>(
        &mut self,
        pipeline: &UploadPipeline<T>,
        file: &SourceFile,
        mut on_progress: P,
    ) -> Result<IngestReport>
    where
        T: UploadTransport,
        P: FnMut(Progress) + Send,
    {
        self.clear_session();
        self.loading = true;
        self.progress = Some(Progress { chunks_sent: 0, total_chunks: 0 });
        info!(file = %file.name, bytes = file.len(), mode = ?pipeline.mode(), "upload started");

        let progress = &mut self.progress;
        let outcome = pipeline
            .upload(file, |p| {
                *progress = Some(p);
                on_progress(p);
            })
            .await;
        self.loading = false;

        let outcome = outcome.inspect_err(|e| error!(error = %e, "upload failed"))?;
        let mut report = self.install(outcome.document)?;
        report.file_id = Some(outcome.file_id);
        report.chunks_sent = outcome.chunks_sent;
        Ok(report)
    }

    /// Show an already-parsed graph, replacing the current one.
    pub fn load_graph(&mut self, document: GraphDocument) -> Result<IngestReport> {
        self.clear_session();
        self.install(document)
    }

    /// Load the graph document at `path`, if there is one. A missing file is
    /// not an error; the session just stays empty.
    pub fn load_default_graph(&mut self, path: impl AsRef<Path>) -> Result<Option<IngestReport>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no default graph");
            return Ok(None);
        }
        let body = std::fs::read(path)?;
        let document = GraphDocument::from_slice(&body)?;
        self.load_graph(document).map(Some)
    }

    fn clear_session(&mut self) {
        let effects = self.hover.teardown();
        self.hover_effects.extend(effects);
        self.surface.reset();
        self.store.clear();
        self.display.reset_session();
        self.progress = None;
    }

    fn install(&mut self, document: GraphDocument) -> Result<IngestReport> {
        let (node_count, edge_count) = {
            let graph = self.store.set_document(document)?;
            (graph.node_count(), graph.edge_count())
        };
        let report = IngestReport {
            file_id: None,
            chunks_sent: 0,
            node_count,
            edge_count,
            dropped_edges: self.store.dropped_edges(),
        };
        if self.store.entity_types().is_empty() {
            warn!("loaded graph has no nodes");
        }
        self.display.initial_load(&mut self.surface);
        info!(nodes = report.node_count, edges = report.edge_count, types = self.store.entity_types().len(), "graph loaded");
        Ok(report)
    }

    // ========================================================================
    // Intents
    // ========================================================================

    pub fn toggle_type(&mut self, entity_type: &str) -> MutationSummary {
        let summary = self.display.toggle_type(&self.store, &mut self.surface, entity_type);
        self.after_mutation(summary)
    }

    pub fn set_display_cap(&mut self, cap: usize) -> Result<MutationSummary> {
        let summary = self.display.set_display_cap(&self.store, &mut self.surface, cap)?;
        Ok(self.after_mutation(summary))
    }

    pub fn reset_view(&mut self) -> MutationSummary {
        let summary = self.display.reset_view(&self.store, &mut self.surface);
        self.after_mutation(summary)
    }

    pub fn expand(&mut self, id: &NodeId) -> MutationSummary {
        let summary = self.display.expand(&self.store, &mut self.surface, id);
        self.after_mutation(summary)
    }

    /// Expand from a neighbourhood served by `source` instead of the store.
    pub async fn expand_remote<N>(&mut self, source: &N, id: &NodeId) -> Result<MutationSummary>
    where
        N: NeighborSource + ?Sized,
    {
        if !self.surface.contains_node(id) {
            return Ok(MutationSummary::default());
        }
        let neighbourhood = source.fetch_neighbors(id).await?;
        let summary = self.display.expand_with(&mut self.surface, id, neighbourhood);
        Ok(self.after_mutation(summary))
    }

    pub fn isolate(&mut self, id: &NodeId) -> MutationSummary {
        let summary = self.display.isolate(&mut self.surface, id);
        self.after_mutation(summary)
    }

    pub fn select_node(&mut self, id: &NodeId) -> Result<()> {
        self.display.select_node(&self.surface, id)
    }

    pub fn clear_selection(&mut self) {
        self.display.clear_selection();
    }

    fn after_mutation(&mut self, summary: MutationSummary) -> MutationSummary {
        if !summary.removed_nodes.is_empty() {
            let effects = self.hover.nodes_removed(&summary.removed_nodes);
            self.hover_effects.extend(effects);
        }
        summary
    }

    // ========================================================================
    // Hover
    // ========================================================================

    /// Pointer entered a node. Undisplayed nodes are ignored.
    pub fn pointer_over(&mut self, id: &NodeId) -> Vec<HoverEffect> {
        if !self.surface.contains_node(id) {
            return self.take_hover_effects();
        }
        let effects = self.hover.pointer_over(id);
        self.with_queued(effects)
    }

    pub fn pointer_out(&mut self, id: &NodeId) -> Vec<HoverEffect> {
        let effects = self.hover.pointer_out(id);
        self.with_queued(effects)
    }

    pub fn timer_fired(&mut self, handle: TimerHandle) -> Vec<HoverEffect> {
        let effects = self.hover.timer_fired(handle);
        self.with_queued(effects)
    }

    /// The expand popup was clicked: expand its node, then drop the popup.
    pub fn click_affordance(&mut self) -> (Option<MutationSummary>, Vec<HoverEffect>) {
        let mut summary = None;
        let (store, surface, display) = (&self.store, &mut self.surface, &mut self.display);
        let (_, effects) = self.hover.click_affordance(|node| {
            summary = Some(display.expand(store, surface, node));
        });
        let summary = summary.map(|s| self.after_mutation(s));
        (summary, self.with_queued(effects))
    }

    /// Effects queued by intents since the last call.
    pub fn take_hover_effects(&mut self) -> Vec<HoverEffect> {
        std::mem::take(&mut self.hover_effects)
    }

    fn with_queued(&mut self, effects: Vec<HoverEffect>) -> Vec<HoverEffect> {
        let mut all = self.take_hover_effects();
        all.extend(effects);
        all
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Progress of the current or last upload.
    pub fn upload_progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn entity_types(&self) -> &[String] {
        self.store.entity_types()
    }

    pub fn active_types(&self) -> &[String] {
        self.display.active_types()
    }

    pub fn display_cap(&self) -> usize {
        self.display.cap()
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.display.selected()
    }

    /// Details for a displayed node.
    pub fn inspect(&self, id: &NodeId) -> Option<NodeDetails> {
        export::node_details(&self.surface, id)
    }

    pub fn export_view(&self) -> GraphDocument {
        export::export_view(&self.surface)
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn hover(&self) -> &HoverCoordinator<C> {
        &self.hover
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Upload failed on chunk {chunk} of {total_chunks}: {message}")]
    Transport { chunk: usize, total_chunks: usize, message: String },

    #[error("No graph data received: {0}")]
    IngestData(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Node not displayed: {0}")]
    NodeNotDisplayed(NodeId),

    #[error("Display cap must be at least 1, got {0}")]
    InvalidCap(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
