//! In-process backend.
//!
//! This is the reference implementation of `UploadTransport` and
//! `NeighborSource`. Chunks are reassembled per file id, the terminal
//! response is produced from a configured [`Responder`], and every request
//! is recorded for inspection.
//!
//! ## Limitations
//!
//! - **No IFC parsing**: the graph comes from the responder, not the file.
//!   `Responder::Echo` returns the reassembled file itself, which is handy
//!   when the "file" already is a graph document.
//! - **Ordered chunks only**: a chunk that is not the next expected one for
//!   its file id is rejected.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use super::{ChunkMeta, NeighborSource, UploadTransport};
use crate::model::{Graph, GraphDocument, NodeId};
use crate::{Error, Result};

/// Body returned for every non-terminal chunk.
pub const CHUNK_ACK: &[u8] = br#"{"status":"chunk received"}"#;

/// How the terminal response is produced.
#[derive(Debug, Clone)]
pub enum Responder {
    /// Always this body.
    Fixed(Bytes),
    /// The reassembled upload, byte for byte.
    Echo,
}

/// One request as the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Chunk { meta: ChunkMeta, len: usize },
    File { name: String, len: usize },
    Neighbors { node: NodeId },
}

#[derive(Debug, Default)]
struct Inner {
    requests: Vec<RecordedRequest>,
    /// file id → (next expected chunk, bytes so far)
    pending: HashMap<String, (usize, BytesMut)>,
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// In-memory upload and neighbour backend. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    responder: Responder,
    fail_on_chunk: Option<usize>,
    neighbors: Option<Arc<Graph>>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            fail_on_chunk: None,
            neighbors: None,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Answer the terminal request with `document`.
    pub fn responding(document: &GraphDocument) -> Result<Self> {
        let body = serde_json::to_vec(document)?;
        Ok(Self::new(Responder::Fixed(Bytes::from(body))))
    }

    /// Answer the terminal request with the reassembled upload.
    pub fn echo() -> Self {
        Self::new(Responder::Echo)
    }

    /// Reject chunk `n` (and the single-shot request when `n == 0`).
    pub fn with_failure_on_chunk(mut self, n: usize) -> Self {
        self.fail_on_chunk = Some(n);
        self
    }

    /// Serve `fetch_neighbors` from `graph`.
    pub fn with_neighbor_graph(mut self, graph: Graph) -> Self {
        self.neighbors = Some(Arc::new(graph));
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }

    /// Chunk metadata received so far, in arrival order.
    pub fn chunks(&self) -> Vec<ChunkMeta> {
        self.inner
            .lock()
            .requests
            .iter()
            .filter_map(|r| match r {
                RecordedRequest::Chunk { meta, .. } => Some(meta.clone()),
                _ => None,
            })
            .collect()
    }

    fn terminal(&self, assembled: Bytes) -> Bytes {
        match &self.responder {
            Responder::Fixed(body) => body.clone(),
            Responder::Echo => assembled,
        }
    }
}

#[async_trait]
impl UploadTransport for MemoryTransport {
    async fn send_chunk(&self, meta: &ChunkMeta, chunk: Bytes) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        inner.requests.push(RecordedRequest::Chunk { meta: meta.clone(), len: chunk.len() });

        if self.fail_on_chunk == Some(meta.chunk_number) {
            inner.pending.remove(&meta.file_id);
            return Err(Error::Transport {
                chunk: meta.chunk_number,
                total_chunks: meta.total_chunks,
                message: "backend rejected chunk".into(),
            });
        }

        let (expected, buf) = inner.pending.entry(meta.file_id.clone()).or_default();
        if meta.chunk_number != *expected {
            let message = format!("expected chunk {expected}, got {}", meta.chunk_number);
            inner.pending.remove(&meta.file_id);
            return Err(Error::Transport {
                chunk: meta.chunk_number,
                total_chunks: meta.total_chunks,
                message,
            });
        }
        *expected += 1;
        buf.extend_from_slice(&chunk);

        if !meta.is_last() {
            return Ok(Bytes::from_static(CHUNK_ACK));
        }
        let assembled = inner
            .pending
            .remove(&meta.file_id)
            .map(|(_, buf)| buf.freeze())
            .unwrap_or_default();
        Ok(self.terminal(assembled))
    }

    async fn send_file(&self, file_name: &str, body: Bytes) -> Result<Bytes> {
        self.inner
            .lock()
            .requests
            .push(RecordedRequest::File { name: file_name.to_owned(), len: body.len() });

        if self.fail_on_chunk == Some(0) {
            return Err(Error::Transport {
                chunk: 0,
                total_chunks: 1,
                message: "backend rejected file".into(),
            });
        }
        Ok(self.terminal(body))
    }
}

#[async_trait]
impl NeighborSource for MemoryTransport {
    /// The node, its incident edges, and their far endpoints. Unknown ids
    /// yield an empty document.
    async fn fetch_neighbors(&self, node: &NodeId) -> Result<GraphDocument> {
        self.inner.lock().requests.push(RecordedRequest::Neighbors { node: node.clone() });

        let Some(graph) = &self.neighbors else {
            return Err(Error::Transport {
                chunk: 0,
                total_chunks: 1,
                message: "no neighbour source configured".into(),
            });
        };

        let edges: Vec<_> = graph.edges.iter().filter(|e| e.touches(node)).collect();
        let nodes = graph.nodes.iter().filter(|n| {
            n.id == *node || edges.iter().any(|e| e.other_end(node) == Some(&n.id))
        });
        if !graph.nodes.iter().any(|n| n.id == *node) {
            return Ok(GraphDocument::default());
        }
        Ok(GraphDocument::from_parts(nodes, edges.iter().copied()))
    }
}
