//! ecfr-embed
//!
//! Sentence embeddings for chunks and queries. `BertEmbedder` runs a local
//! sentence-transformers BERT checkpoint (default `all-MiniLM-L6-v2`) with
//! candle; `FakeEmbedder` is a deterministic hashed bag of words for tests and
//! offline runs.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use ecfr_core::traits::Embedder;
use ecfr_core::PipelineConfig;
use indicatif::{ProgressBar, ProgressStyle};
use tokenizers::Tokenizer;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

pub const FAKE_DIM: usize = 384;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
}

impl BertEmbedder {
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let model_dir = resolve_model_dir(config, &config.model_name)?;
        Self::from_dir(&model_dir, &config.model_name, config.max_seq_len, config.embed_batch_size)
    }

    pub fn from_dir(model_dir: &Path, model_name: &str, max_len: usize, batch_size: usize) -> Result<Self> {
        let device = device::select_device();
        tracing::info!("Loading embedding model {} from {}", model_name, model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?,
        )
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let max_len = max_len.min(config.max_position_embeddings).max(1);
        tokenize::configure(&mut tokenizer, max_len)?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).context("Failed to build BERT model from weights")?;
        tracing::info!(
            "Model loaded: {} dims, {} layers, max {} tokens",
            config.hidden_size,
            config.num_hidden_layers,
            max_len
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: model_name.to_string(),
            dim: config.hidden_size,
            max_len,
            batch_size: batch_size.max(1),
        })
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .context("BERT forward pass failed")?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?;
        Ok(rows)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the file is memory-mapped read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let bin = model_dir.join("pytorch_model.bin");
    if bin.exists() {
        let weights = candle_core::pickle::read_all(&bin)?;
        let weights: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights, DType::F32, device));
    }
    Err(anyhow!(
        "No model.safetensors or pytorch_model.bin in {}",
        model_dir.display()
    ))
}

impl Embedder for BertEmbedder {
    fn model_name(&self) -> &str { &self.model_name }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let pb = (texts.len() > self.batch_size).then(|| {
            let pb = ProgressBar::new(texts.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        });

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.encode(batch)?);
            if let Some(pb) = &pb {
                pb.inc(batch.len() as u64);
            }
        }
        if let Some(pb) = pb {
            pb.finish_with_message("embedded");
        }
        tracing::debug!("Embedded {} texts in {:?}", texts.len(), start.elapsed());
        Ok(out)
    }
}

/// Hashed bag of lowercased words, L2-normalized. Same text, same vector.
pub struct FakeEmbedder {
    dim: usize,
    name: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, name: format!("fake-xxhash-{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self { Self::new(FAKE_DIM) }
}

impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str { &self.name }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_requested(config: &PipelineConfig) -> bool {
    config.use_fake_embeddings
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// Embedder for a build or query run. `model_override` replaces
/// `config.model_name` (and ignores an explicit `model_dir`).
pub fn load_embedder(config: &PipelineConfig, model_override: Option<&str>) -> Result<Box<dyn Embedder>> {
    if fake_requested(config) {
        tracing::info!("Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::default()));
    }
    match model_override {
        Some(name) if name != config.model_name => {
            let cfg = PipelineConfig { model_name: name.to_string(), model_dir: None, ..config.clone() };
            Ok(Box::new(BertEmbedder::load(&cfg)?))
        }
        _ => Ok(Box::new(BertEmbedder::load(config)?)),
    }
}

/// Candidates in order: configured `model_dir`, `$MODEL_DIR`,
/// `<models_root>/<name>`, `../models/<name>`.
pub fn resolve_model_dir(config: &PipelineConfig, model_name: &str) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if config.model_dir.is_some() {
        candidates.push(config.model_dir_path());
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        candidates.push(PathBuf::from(dir));
    }
    candidates.push(ecfr_core::config::expand_path(&config.models_root).join(model_name));
    candidates.push(Path::new("../models").join(model_name));

    match candidates.iter().find(|p| p.join("config.json").exists()) {
        Some(dir) => {
            tracing::debug!("Using model dir: {}", dir.display());
            Ok(dir.clone())
        }
        None => Err(anyhow!(
            "Could not locate model directory for {} (tried {})",
            model_name,
            candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        )),
    }
}
