//! Explorer configuration.
//!
//! Everything has a usable default; `from_env()` overrides from the
//! environment so the backend location can be set per deployment.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `GRAPH_BACKEND_URL` | `backend_url` | `http://127.0.0.1:5050` |
//! | `GRAPH_CHUNK_SIZE` | `chunk_size` (bytes) | 5 MiB |
//! | `GRAPH_DEFAULT_CAP` | `default_cap` | 50 |
//! | `GRAPH_TRANSPORT` | `transport_mode` (`chunked` / `single`) | `chunked` |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::display::CapPolicy;
use crate::ingest::{TransportMode, DEFAULT_CHUNK_SIZE};
use crate::{Error, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5050";
pub const DEFAULT_CAP: usize = 50;

/// Hover popup timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverTiming {
    /// Hover time before the popup appears.
    pub show_delay: Duration,
    /// How long the popup stays before fading on its own.
    pub visible_for: Duration,
    /// Fade duration before the popup is removed.
    pub fade_out: Duration,
}

impl Default for HoverTiming {
    fn default() -> Self {
        Self {
            show_delay: Duration::from_millis(400),
            visible_for: Duration::from_secs(3),
            fade_out: Duration::from_millis(250),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub backend_url: String,
    pub chunk_size: usize,
    pub transport_mode: TransportMode,
    pub default_cap: usize,
    pub cap_policy: CapPolicy,
    pub hover: HoverTiming,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            transport_mode: TransportMode::Chunked,
            default_cap: DEFAULT_CAP,
            cap_policy: CapPolicy::PerType,
            hover: HoverTiming::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup` (the environment, or a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("GRAPH_BACKEND_URL") {
            config.backend_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(raw) = lookup("GRAPH_CHUNK_SIZE") {
            config.chunk_size = parse_positive("GRAPH_CHUNK_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("GRAPH_DEFAULT_CAP") {
            config.default_cap = parse_positive("GRAPH_DEFAULT_CAP", &raw)?;
        }
        if let Some(raw) = lookup("GRAPH_TRANSPORT") {
            config.transport_mode = match raw.trim().to_ascii_lowercase().as_str() {
                "chunked" => TransportMode::Chunked,
                "single" | "single-shot" => TransportMode::SingleShot,
                other => return Err(Error::Config(format!("GRAPH_TRANSPORT: unknown mode '{other}'"))),
            };
        }
        Ok(config)
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    pub fn with_default_cap(mut self, cap: usize) -> Self {
        self.default_cap = cap;
        self
    }

    pub fn with_cap_policy(mut self, policy: CapPolicy) -> Self {
        self.cap_policy = policy;
        self
    }

    pub fn with_hover(mut self, hover: HoverTiming) -> Self {
        self.hover = hover;
        self
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(Error::Config(format!("{key}: must be positive"))),
        Ok(v) => Ok(v),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}
