use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, DType, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Sentence embedder over a local BERT checkpoint (all-MiniLM-L6-v2 layout).
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    pad_id: u32,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path, max_len: usize, batch_size: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        // padding and truncation are applied by tokenize_batch
        let _ = tokenizer.with_padding(None);
        let _ = tokenizer.with_truncation(None);
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().and_then(|n| n.to_str()).unwrap_or(MODEL_NAME);
        tracing::info!(model = name, dim, "embedding model loaded");
        Ok(Self { model, tokenizer, device, id: format!("bert:{name}:d{dim}"), dim, max_len, batch_size, pad_id })
    }

    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let batch = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        if start.elapsed().as_millis() > 1000 {
            tracing::warn!(elapsed = ?start.elapsed(), batch = texts.len(), "slow embedding batch");
        }
        Ok(vectors)
    }
}

impl ragdb_core::traits::Embedder for BertEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn batch_size(&self) -> usize { self.batch_size }
    fn embed_batch(&self, texts: &[String]) -> ragdb_core::Result<Vec<Vec<f32>>> {
        self.embed_texts(texts).map_err(|e| ragdb_core::Error::Embedding(format!("{e:#}")))
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is only read, and not modified while mapped
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .with_context(|| format!("Failed to read weights from {}", weights_path.display()))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Look for the model directory: explicit setting, `APP_MODEL_DIR`,
/// `MODEL_DIR`, then `../models/<name>` and `models/<name>`.
pub fn resolve_model_dir(explicit: Option<&str>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = explicit { candidates.push(ragdb_core::config::expand_path(dir)); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { candidates.push(PathBuf::from(dir)); }
    }
    candidates.push(Path::new("../models").join(MODEL_NAME));
    candidates.push(Path::new("models").join(MODEL_NAME));
    for p in &candidates {
        if p.exists() {
            tracing::debug!(dir = %p.display(), "using model dir");
            return Ok(p.clone());
        }
    }
    Err(anyhow!("Could not locate {MODEL_NAME} model directory (checked {:?})", candidates))
}
