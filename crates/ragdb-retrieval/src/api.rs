//! Async boundary over [`Collection`].
//!
//! Collection methods are synchronous and may block on the model or the
//! disk, so every call here goes through `spawn_blocking` under a
//! caller-chosen timeout. Request and response shapes mirror the upload and
//! chat endpoints a web layer would expose.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ragdb_core::loader::DocumentKind;
use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{CollectionStats, IngestReport, ScoredChunk};
use ragdb_core::{Error, Result};
use ragdb_vector::FlatIndex;

use crate::collection::{Collection, IngestSource};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<ScoredChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub chunks_created: usize,
}

/// HTTP status a web layer should answer with for `err`.
pub fn status_code(err: &Error) -> u16 {
    match err {
        e if e.is_client_error() => 400,
        Error::Timeout(_) => 504,
        _ => 500,
    }
}

/// Shared handle used by request handlers.
pub struct RagService<I: VectorIndex = FlatIndex> {
    collection: Arc<Collection<I>>,
    timeout: Duration,
}

impl<I: VectorIndex> Clone for RagService<I> {
    fn clone(&self) -> Self {
        Self { collection: Arc::clone(&self.collection), timeout: self.timeout }
    }
}

impl<I: VectorIndex + 'static> RagService<I> {
    pub fn new(collection: Arc<Collection<I>>) -> Self {
        Self { collection, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn collection(&self) -> &Arc<Collection<I>> { &self.collection }

    /// Ingest an uploaded file. The type comes from `filename`'s extension.
    pub async fn upload(&self, filename: String, bytes: Vec<u8>) -> Result<UploadResponse> {
        let extension = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        // reject before handing the bytes to a worker thread
        DocumentKind::from_extension(&extension)?;
        let collection = Arc::clone(&self.collection);
        let name = filename.clone();
        let report: IngestReport = run_blocking(self.timeout, move || {
            collection.ingest(IngestSource::Bytes { bytes, extension }, &name)
        })
        .await?;
        Ok(UploadResponse {
            message: format!("Successfully added document: {filename}"),
            chunks_created: report.chunks_created,
        })
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        if request.k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        let collection = Arc::clone(&self.collection);
        let QueryRequest { message, k } = request;
        let text = message.clone();
        let results = run_blocking(self.timeout, move || collection.query(&text, k)).await?;
        Ok(QueryResponse { query: message, results })
    }

    pub async fn stats(&self) -> Result<CollectionStats> {
        let collection = Arc::clone(&self.collection);
        run_blocking(self.timeout, move || Ok(collection.stats())).await
    }

    pub async fn clear(&self) -> Result<()> {
        let collection = Arc::clone(&self.collection);
        run_blocking(self.timeout, move || collection.clear()).await
    }
}

/// Run `f` on the blocking pool. On timeout the task keeps running to
/// completion; only the caller stops waiting.
pub async fn run_blocking<T, F>(timeout: Duration, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Err(_) => {
            tracing::warn!(?timeout, "blocking call timed out");
            Err(Error::Timeout(timeout))
        }
        Ok(Err(join)) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
        Ok(Err(join)) => Err(Error::Internal(format!("blocking task failed: {join}"))),
        Ok(Ok(result)) => result,
    }
}
