use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor, DType};
use tokenizers::Tokenizer;

pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

/// Tokenize `texts` into `[B, max_len]` tensors.
///
/// Every row is padded (or truncated) to exactly `max_len`, so a text yields
/// the same row whatever else is in the batch. Truncation keeps the final
/// special token (`[SEP]`).
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<EncodedBatch> {
    let mut ids = Vec::with_capacity(texts.len() * max_len);
    let mut mask = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut row_ids = enc.get_ids().to_vec();
        let mut row_mask = enc.get_attention_mask().to_vec();
        if row_ids.len() > max_len {
            let last = row_ids[row_ids.len() - 1];
            row_ids.truncate(max_len);
            row_mask.truncate(max_len);
            row_ids[max_len - 1] = last;
            tracing::debug!(max_len, "input truncated to model length");
        }
        let pad = max_len - row_ids.len();
        row_ids.extend(std::iter::repeat(pad_id).take(pad));
        row_mask.extend(std::iter::repeat(0).take(pad));
        ids.extend(row_ids);
        mask.extend(row_mask);
    }
    let shape = (texts.len(), max_len);
    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, shape, device)?,
        attention_mask: Tensor::from_vec(mask, shape, device)?,
        token_type_ids: Tensor::zeros(shape, DType::U32, device)?,
    })
}
