//! # Ingestion Pipeline
//!
//! Streams a source file to the backend and resolves the graph document
//! from the terminal response.
//!
//! ## Transport modes
//!
//! | Mode | Requests | Authoritative response |
//! |------|----------|------------------------|
//! | `Chunked` | one per chunk, strictly in order `0..total` | the last chunk's |
//! | `SingleShot` | one, whole file | that one |
//!
//! Chunk *k+1* is only sent once chunk *k*'s response has arrived. Earlier
//! responses are acknowledgements and are never parsed. Any transport
//! failure aborts the upload; nothing is applied.
//!
//! ## Transports
//!
//! | Transport | Module | Description |
//! |-----------|--------|-------------|
//! | `MemoryTransport` | `memory` | In-process backend for tests/embedding |
//! | `HttpBackend` | `http` | reqwest client (`http` feature) |
//!
//! An in-flight upload has no cancel path; it runs to completion or failure.

pub mod memory;
#[cfg(feature = "http")]
pub mod http;

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{GraphDocument, NodeId};
use crate::{Error, Result};

pub use memory::MemoryTransport;
#[cfg(feature = "http")]
pub use http::HttpBackend;

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Header names carried by every chunk request.
pub const HEADER_FILE_ID: &str = "file-id";
pub const HEADER_CHUNK_NUMBER: &str = "chunk-number";
pub const HEADER_TOTAL_CHUNKS: &str = "total-chunks";

// ============================================================================
// Types
// ============================================================================

/// How the file is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportMode {
    #[default]
    Chunked,
    SingleShot,
}

/// Metadata sent with one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub file_id: String,
    pub chunk_number: usize,
    pub total_chunks: usize,
}

impl ChunkMeta {
    pub fn is_last(&self) -> bool {
        self.chunk_number + 1 == self.total_chunks
    }

    /// `(name, value)` header pairs for this chunk.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_FILE_ID, self.file_id.clone()),
            (HEADER_CHUNK_NUMBER, self.chunk_number.to_string()),
            (HEADER_TOTAL_CHUNKS, self.total_chunks.to_string()),
        ]
    }
}

/// Upload progress after a chunk acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub chunks_sent: usize,
    pub total_chunks: usize,
}

impl Progress {
    /// `round(chunks_sent / total_chunks * 100)`
    pub fn percent(&self) -> u8 {
        if self.total_chunks == 0 {
            return 0;
        }
        ((self.chunks_sent as f64 / self.total_chunks as f64) * 100.0).round() as u8
    }
}

/// A file ready to upload.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub body: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { name: name.into(), body: body.into() }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let body = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.ifc".to_owned());
        Ok(Self::new(name, body))
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Ordered split of a file into fixed-size chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub file_id: String,
    pub chunk_size: usize,
    pub len: usize,
}

impl ChunkPlan {
    /// `chunk_size` of zero is treated as one byte.
    pub fn new(file_id: impl Into<String>, len: usize, chunk_size: usize) -> Self {
        Self { file_id: file_id.into(), chunk_size: chunk_size.max(1), len }
    }

    pub fn total_chunks(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    /// Chunks in send order. Slices share `body`'s buffer.
    pub fn chunks<'a>(&'a self, body: &'a Bytes) -> impl Iterator<Item = (ChunkMeta, Bytes)> + 'a {
        let total = self.total_chunks();
        (0..total).map(move |n| {
            let start = n * self.chunk_size;
            let end = (start + self.chunk_size).min(self.len);
            let meta = ChunkMeta {
                file_id: self.file_id.clone(),
                chunk_number: n,
                total_chunks: total,
            };
            (meta, body.slice(start..end))
        })
    }
}

/// A completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_id: String,
    pub chunks_sent: usize,
    pub document: GraphDocument,
}

/// What a load put into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// `None` when the graph did not come through an upload.
    pub file_id: Option<String>,
    pub chunks_sent: usize,
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges filtered for a missing endpoint or a repeated id.
    pub dropped_edges: usize,
}

// ============================================================================
// Transport traits
// ============================================================================

/// Sends file bytes to the backend and returns raw response bodies.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Send one chunk; returns the response body.
    async fn send_chunk(&self, meta: &ChunkMeta, chunk: Bytes) -> Result<Bytes>;

    /// Submit the whole file in one request; returns the response body.
    async fn send_file(&self, file_name: &str, body: Bytes) -> Result<Bytes>;
}

/// Serves a node's first-degree neighbourhood when the full graph is not
/// held locally.
#[async_trait]
pub trait NeighborSource: Send + Sync {
    async fn fetch_neighbors(&self, node: &NodeId) -> Result<GraphDocument>;
}

// ============================================================================
// File ids
// ============================================================================

static LAST_FILE_ID: AtomicI64 = AtomicI64::new(0);

/// Submission time in milliseconds, bumped past the last id this process
/// issued so two uploads in the same millisecond still differ.
pub fn next_file_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let prev = LAST_FILE_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or_else(|last| last);
    now.max(prev + 1).to_string()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives a transport through one upload.
#[derive(Debug)]
pub struct UploadPipeline<T: UploadTransport> {
    transport: T,
    chunk_size: usize,
    mode: TransportMode,
}

impl<T: UploadTransport> UploadPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, chunk_size: DEFAULT_CHUNK_SIZE, mode: TransportMode::Chunked }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `file` and resolve the graph document from the terminal
    /// response. `on_progress` runs after every acknowledged request.
    pub async fn upload<P>(&self, file: &SourceFile, mut on_progress: P) -> Result<UploadOutcome>
    where
        P: FnMut(Progress) + Send,
    {
        let file_id = next_file_id();
        match self.mode {
            TransportMode::Chunked => self.upload_chunked(file_id, file, &mut on_progress).await,
            TransportMode::SingleShot => self.upload_single(file_id, file, &mut on_progress).await,
        }
    }

    async fn upload_chunked<P>(&self, file_id: String, file: &SourceFile, on_progress: &mut P) -> Result<UploadOutcome>
    where
        P: FnMut(Progress) + Send,
    {
        let plan = ChunkPlan::new(file_id.clone(), file.len(), self.chunk_size);
        let total = plan.total_chunks();
        let mut last_response = None;

        for (meta, chunk) in plan.chunks(&file.body) {
            let number = meta.chunk_number;
            let body = self
                .transport
                .send_chunk(&meta, chunk)
                .await
                .map_err(|e| transport_error(e, number, total))?;
            info!(file_id = %file_id, "uploaded chunk {}/{}", number + 1, total);
            on_progress(Progress { chunks_sent: number + 1, total_chunks: total });
            last_response = Some(body);
        }

        let Some(body) = last_response else {
            warn!(file = %file.name, "no graph data received: nothing was sent");
            return Err(Error::IngestData("empty file".into()));
        };
        let document = parse_terminal(&body)?;
        Ok(UploadOutcome { file_id, chunks_sent: total, document })
    }

    async fn upload_single<P>(&self, file_id: String, file: &SourceFile, on_progress: &mut P) -> Result<UploadOutcome>
    where
        P: FnMut(Progress) + Send,
    {
        let body = self
            .transport
            .send_file(&file.name, file.body.clone())
            .await
            .map_err(|e| transport_error(e, 0, 1))?;
        info!(file_id = %file_id, bytes = file.len(), "uploaded file in one request");
        on_progress(Progress { chunks_sent: 1, total_chunks: 1 });
        let document = parse_terminal(&body)?;
        Ok(UploadOutcome { file_id, chunks_sent: 1, document })
    }
}

fn parse_terminal(body: &[u8]) -> Result<GraphDocument> {
    GraphDocument::from_slice(body).inspect_err(|e| warn!(error = %e, "no graph data received"))
}

fn transport_error(err: Error, chunk: usize, total_chunks: usize) -> Error {
    let err = match err {
        Error::Transport { .. } => err,
        other => Error::Transport { chunk, total_chunks, message: other.to_string() },
    };
    warn!(error = %err, "upload aborted");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_plan_split() {
        let body = Bytes::from(vec![7u8; 25]);
        let plan = ChunkPlan::new("42", body.len(), 10);
        let chunks: Vec<(ChunkMeta, Bytes)> = plan.chunks(&body).collect();

        assert_eq!(plan.total_chunks(), 3);
        assert_eq!(chunks.iter().map(|(_, c)| c.len()).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(chunks.iter().map(|(m, _)| m.chunk_number).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(chunks[2].0.is_last());
        assert!(!chunks[0].0.is_last());
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        let plan = ChunkPlan::new("1", 0, DEFAULT_CHUNK_SIZE);
        assert_eq!(plan.total_chunks(), 0);
    }

    #[test]
    fn test_exact_multiple() {
        let plan = ChunkPlan::new("1", 20, 10);
        assert_eq!(plan.total_chunks(), 2);
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(Progress { chunks_sent: 1, total_chunks: 3 }.percent(), 33);
        assert_eq!(Progress { chunks_sent: 2, total_chunks: 3 }.percent(), 67);
        assert_eq!(Progress { chunks_sent: 3, total_chunks: 3 }.percent(), 100);
    }

    #[test]
    fn test_headers() {
        let meta = ChunkMeta { file_id: "1700000000000".into(), chunk_number: 2, total_chunks: 5 };
        let headers = meta.headers();
        assert_eq!(headers[0], ("file-id", "1700000000000".to_string()));
        assert_eq!(headers[1], ("chunk-number", "2".to_string()));
        assert_eq!(headers[2], ("total-chunks", "5".to_string()));
    }

    #[test]
    fn test_file_ids_unique() {
        let a: i64 = next_file_id().parse().unwrap();
        let b: i64 = next_file_id().parse().unwrap();
        assert!(b > a);
    }
}
