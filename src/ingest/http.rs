//! reqwest-backed transport for a remote graph backend.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | chunk | `POST {base}/upload`, `application/octet-stream`, headers `file-id`, `chunk-number`, `total-chunks` |
//! | single-shot | `POST {base}/upload`, multipart field `file` |
//! | neighbours | `POST {base}/fetch_neighbors`, JSON `{"node_id": ..}` |
//!
//! Non-success statuses surface as [`Error::Http`](crate::Error::Http).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::debug;

use super::{ChunkMeta, NeighborSource, UploadTransport};
use crate::config::ExplorerConfig;
use crate::model::{GraphDocument, NodeId};
use crate::Result;

#[derive(Serialize)]
struct NeighborRequest<'a> {
    node_id: &'a NodeId,
}

/// HTTP client for the upload and neighbour endpoints.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http_client: HttpClient,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(300))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { base_url, http_client })
    }

    pub fn from_config(config: &ExplorerConfig) -> Result<Self> {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl UploadTransport for HttpBackend {
    async fn send_chunk(&self, meta: &ChunkMeta, chunk: Bytes) -> Result<Bytes> {
        let mut request = self
            .http_client
            .post(self.url("/upload"))
            .header("Content-Type", "application/octet-stream");
        for (name, value) in meta.headers() {
            request = request.header(name, value);
        }

        debug!(chunk = meta.chunk_number, total = meta.total_chunks, bytes = chunk.len(), "POST /upload");
        let response = request.body(chunk).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }

    async fn send_file(&self, file_name: &str, body: Bytes) -> Result<Bytes> {
        let part = Part::bytes(body.to_vec()).file_name(file_name.to_owned());
        let form = Form::new().part("file", part);

        debug!(file = file_name, bytes = body.len(), "POST /upload (multipart)");
        let response = self
            .http_client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl NeighborSource for HttpBackend {
    async fn fetch_neighbors(&self, node: &NodeId) -> Result<GraphDocument> {
        let response = self
            .http_client
            .post(self.url("/fetch_neighbors"))
            .json(&NeighborRequest { node_id: node })
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        GraphDocument::from_slice(&body)
    }
}
