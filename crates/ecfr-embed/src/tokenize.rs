use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection, TruncationParams,
    TruncationStrategy,
};

/// Pad each batch to its longest sequence and truncate at `max_len` tokens.
pub fn configure(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        direction: PaddingDirection::Right,
        pad_to_multiple_of: None,
        pad_id,
        pad_type_id: 0,
        pad_token,
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            direction: TruncationDirection::Right,
            max_length: max_len,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
        }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    Ok(())
}

/// Encode `texts` into `(input_ids [B,T] u32, attention_mask [B,T] f32)` on `device`.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<(Tensor, Tensor)> {
    if texts.is_empty() {
        return Err(anyhow!("Cannot tokenize an empty batch"));
    }
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for (i, enc) in encodings.iter().enumerate() {
        if enc.get_ids().len() != seq_len {
            return Err(anyhow!("Sequence {} has length {}, expected {}", i, enc.get_ids().len(), seq_len));
        }
        ids.extend_from_slice(enc.get_ids());
        mask.extend_from_slice(enc.get_attention_mask());
    }

    let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), device)?.to_dtype(DType::F32)?;
    Ok((input_ids, attention_mask))
}
