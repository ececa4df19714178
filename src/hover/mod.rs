//! # Hover-Affordance Coordinator
//!
//! At most one "expand" popup exists at a time, tied to the hovered node.
//!
//! ```text
//!   Idle ──hover──▶ Pending ──show timer──▶ Shown ──visible timer──▶ FadingOut ──fade timer──▶ Idle
//!                     │ pointer-out             │ click: expand, then dismiss (no fade)
//!                     ▼                         ▼
//!                    Idle                      Idle
//! ```
//!
//! Every transition cancels the timer owned by the state it leaves before
//! arming the next one, and fired handles that do not match the current
//! state are ignored, so a stale callback can never act on a node that has
//! since been removed.

pub mod scheduler;


use tracing::debug;

use crate::config::HoverTiming;
use crate::model::NodeId;

pub use scheduler::{ManualScheduler, Scheduler, TimerHandle};

/// Identity of one popup instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

/// Where the coordinator is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    /// Show timer armed for `node`.
    Pending { node: NodeId, timer: TimerHandle },
    /// Popup attached to `node`; auto-dismiss timer armed.
    Shown { node: NodeId, popup: PopupId, timer: TimerHandle },
    /// Popup fading; removal timer armed.
    FadingOut { node: NodeId, popup: PopupId, timer: TimerHandle },
}

impl HoverPhase {
    fn timer(&self) -> Option<TimerHandle> {
        match self {
            HoverPhase::Idle => None,
            HoverPhase::Pending { timer, .. }
            | HoverPhase::Shown { timer, .. }
            | HoverPhase::FadingOut { timer, .. } => Some(*timer),
        }
    }

    fn node(&self) -> Option<&NodeId> {
        match self {
            HoverPhase::Idle => None,
            HoverPhase::Pending { node, .. }
            | HoverPhase::Shown { node, .. }
            | HoverPhase::FadingOut { node, .. } => Some(node),
        }
    }

    fn popup(&self) -> Option<PopupId> {
        match self {
            HoverPhase::Shown { popup, .. } | HoverPhase::FadingOut { popup, .. } => Some(*popup),
            _ => None,
        }
    }
}

/// What the host should do to its popup layer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEffect {
    Attach { popup: PopupId, node: NodeId },
    BeginFade { popup: PopupId, node: NodeId },
    Detach { popup: PopupId, node: NodeId },
}

/// Owns the single popup slot and its timer.
#[derive(Debug)]
pub struct HoverCoordinator<C: Scheduler> {
    scheduler: C,
    timing: HoverTiming,
    phase: HoverPhase,
    next_popup: u64,
}

impl<C: Scheduler> HoverCoordinator<C> {
    pub fn new(scheduler: C, timing: HoverTiming) -> Self {
        Self {
            scheduler,
            timing,
            phase: HoverPhase::Idle,
            next_popup: 0,
        }
    }

    pub fn phase(&self) -> &HoverPhase {
        &self.phase
    }

    /// Node the coordinator is currently tracking, in any non-idle phase.
    pub fn node(&self) -> Option<&NodeId> {
        self.phase.node()
    }

    /// The live popup, if one is attached.
    pub fn popup(&self) -> Option<PopupId> {
        self.phase.popup()
    }

    pub fn scheduler(&self) -> &C {
        &self.scheduler
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Pointer entered `node`.
    pub fn pointer_over(&mut self, node: &NodeId) -> Vec<HoverEffect> {
        match &self.phase {
            HoverPhase::Pending { node: current, .. } | HoverPhase::Shown { node: current, .. }
                if current == node =>
            {
                return Vec::new();
            }
            _ => {}
        }

        let effects = self.dismiss();
        let timer = self.scheduler.arm(self.timing.show_delay);
        self.phase = HoverPhase::Pending { node: node.clone(), timer };
        effects
    }

    /// Pointer left `node`. Only a pending show is cancelled; a shown popup
    /// stays up so it can be clicked, and times out on its own.
    pub fn pointer_out(&mut self, node: &NodeId) -> Vec<HoverEffect> {
        if let HoverPhase::Pending { node: current, timer } = &self.phase {
            if current == node {
                self.scheduler.cancel(*timer);
                self.phase = HoverPhase::Idle;
            }
        }
        Vec::new()
    }

    /// A scheduler handle came due.
    pub fn timer_fired(&mut self, handle: TimerHandle) -> Vec<HoverEffect> {
        if self.phase.timer() != Some(handle) {
            debug!(?handle, "stale hover timer ignored");
            return Vec::new();
        }

        match std::mem::replace(&mut self.phase, HoverPhase::Idle) {
            HoverPhase::Pending { node, .. } => {
                self.next_popup += 1;
                let popup = PopupId(self.next_popup);
                let timer = self.scheduler.arm(self.timing.visible_for);
                self.phase = HoverPhase::Shown { node: node.clone(), popup, timer };
                vec![HoverEffect::Attach { popup, node }]
            }
            HoverPhase::Shown { node, popup, .. } => {
                let timer = self.scheduler.arm(self.timing.fade_out);
                self.phase = HoverPhase::FadingOut { node: node.clone(), popup, timer };
                vec![HoverEffect::BeginFade { popup, node }]
            }
            HoverPhase::FadingOut { node, popup, .. } => vec![HoverEffect::Detach { popup, node }],
            HoverPhase::Idle => Vec::new(),
        }
    }

    /// The popup was clicked: run `expand` for its node synchronously, then
    /// remove the popup without fading. Returns the expanded node.
    pub fn click_affordance<F>(&mut self, expand: F) -> (Option<NodeId>, Vec<HoverEffect>)
    where
        F: FnOnce(&NodeId),
    {
        let node = match &self.phase {
            HoverPhase::Shown { node, .. } | HoverPhase::FadingOut { node, .. } => node.clone(),
            _ => return (None, Vec::new()),
        };
        expand(&node);
        (Some(node), self.dismiss())
    }

    /// Nodes left the view; drop anything tracking one of them.
    pub fn nodes_removed(&mut self, removed: &[NodeId]) -> Vec<HoverEffect> {
        match self.phase.node() {
            Some(node) if removed.contains(node) => self.dismiss(),
            _ => Vec::new(),
        }
    }

    /// Cancel the armed timer and remove the popup, whatever the phase.
    pub fn dismiss(&mut self) -> Vec<HoverEffect> {
        if let Some(timer) = self.phase.timer() {
            self.scheduler.cancel(timer);
        }
        match std::mem::replace(&mut self.phase, HoverPhase::Idle) {
            HoverPhase::Shown { node, popup, .. } | HoverPhase::FadingOut { node, popup, .. } => {
                vec![HoverEffect::Detach { popup, node }]
            }
            HoverPhase::Pending { .. } | HoverPhase::Idle => Vec::new(),
        }
    }

    /// End of session: release everything.
    pub fn teardown(&mut self) -> Vec<HoverEffect> {
        self.dismiss()
    }
}
