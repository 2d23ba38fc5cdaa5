use crate::error::Result;
use crate::types::{ChunkId, SearchHit};

/// Batch size used by [`Embedder::embed`] unless an implementation says
/// otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Embed one batch in a single model call. Callers should go through
    /// [`Embedder::embed`], which bounds the batch size.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// One L2-normalized vector per input, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size().max(1)) {
            let vectors = self.embed_batch(batch)?;
            if vectors.len() != batch.len() {
                return Err(crate::error::Error::Embedding(format!(
                    "model returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            tracing::debug!(batch = batch.len(), total = texts.len(), "embedded batch");
            out.extend(vectors);
        }
        Ok(out)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::Embedding("model returned no vector".into()))
    }
}

/// Nearest-neighbor structure over `(id, vector)` entries.
pub trait VectorIndex: Send + Sync {
    /// All-or-nothing append; ids must be new.
    fn insert(&mut self, ids: &[ChunkId], vectors: Vec<Vec<f32>>) -> Result<()>;
    /// Up to `k` hits, best first, ties by ascending id.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
    fn clear(&mut self);
    fn size(&self) -> usize;
    /// Vector dimension, or `None` while nothing has been inserted.
    fn dim(&self) -> Option<usize>;
    /// Entries in insertion order, for snapshotting.
    fn entries(&self) -> Vec<(ChunkId, Vec<f32>)>;
}
