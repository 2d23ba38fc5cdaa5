//! Sentence embeddings for ragdb.
//!
//! [`BertEmbedder`] runs a local all-MiniLM-L6-v2 checkpoint with candle;
//! [`HashEmbedder`] is a deterministic stand-in that needs no model files.

mod bert;
mod device;
mod fake;
mod pool;
mod tokenize;

pub use bert::{resolve_model_dir, BertEmbedder, MODEL_NAME};
pub use device::select_device;
pub use fake::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::{tokenize_batch, EncodedBatch};

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::traits::Embedder;

/// Output dimension of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> ragdb_core::Result<Box<dyn Embedder>> {
    if settings.use_fake || fake_requested_by_env() {
        tracing::info!("using HashEmbedder");
        return Ok(Box::new(HashEmbedder::new(EMBEDDING_DIM)));
    }
    let load = || -> anyhow::Result<BertEmbedder> {
        let dir = resolve_model_dir(settings.model_dir.as_deref())?;
        BertEmbedder::load(&dir, settings.max_len, settings.batch_size)
    };
    let model = load().map_err(|e| ragdb_core::Error::Embedding(format!("{e:#}")))?;
    Ok(Box::new(model))
}
