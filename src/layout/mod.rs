//! Layout trigger policy: decides, per mutation, how the surface should
//! re-run its layout.
//!
//! The layout algorithm itself belongs to the surface; this module only
//! produces the two flags it is run with.

use serde::{Deserialize, Serialize};

/// Flags for one layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutRequest {
    /// Discard existing positions. Every mutation here is incremental, so
    /// the policy never sets this.
    pub randomize: bool,
    /// Re-frame the viewport around the displayed graph.
    pub fit: bool,
}

impl LayoutRequest {
    /// Keep positions, keep the viewport.
    pub const INCREMENTAL: LayoutRequest = LayoutRequest { randomize: false, fit: false };
    /// Keep positions, re-frame the viewport.
    pub const FIT: LayoutRequest = LayoutRequest { randomize: false, fit: true };
}

/// The kind of surface mutation that just happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    InitialLoad,
    ResetView,
    SetCap,
    ToggleType,
    Expand,
    Isolate,
}

/// Maps mutations to layout requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutPolicy;

impl LayoutPolicy {
    pub fn request_for(&self, kind: MutationKind) -> LayoutRequest {
        match kind {
            MutationKind::InitialLoad | MutationKind::ResetView => LayoutRequest::FIT,
            MutationKind::SetCap
            | MutationKind::ToggleType
            | MutationKind::Expand
            | MutationKind::Isolate => LayoutRequest::INCREMENTAL,
        }
    }
}
