//! chatrag-embed
//!
//! Local sentence embeddings: a BERT-family encoder (all-MiniLM-L6-v2 by
//! default) run through candle, mean-pooled over the attention mask and
//! L2-normalized. `FakeEmbedder` gives deterministic vectors without a model
//! for tests and offline development.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use chatrag_core::config::EmbeddingSettings;
use chatrag_core::error::Error;
use chatrag_core::traits::EmbeddingProvider;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading sentence embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
        })?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dim = config.hidden_size, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim: config.hidden_size, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", emb.len(), self.dim));
        }
        if start.elapsed().as_millis() > 100 {
            warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

impl EmbeddingProvider for EmbeddingModel {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> chatrag_core::Result<Vec<f32>> {
        self.embed_text(text).map_err(|e| Error::Embedding(e.to_string()))
    }
}

/// Prefers `model.safetensors`, falls back to `pytorch_model.bin`.
fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin under {}", model_dir.display()))
}

/// Hashes whitespace tokens into buckets; same text, same vector.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> chatrag_core::Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

pub fn use_fake_embeddings(settings: &EmbeddingSettings) -> bool {
    settings.fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

pub fn get_default_embedder(
    settings: &EmbeddingSettings,
) -> chatrag_core::Result<Box<dyn EmbeddingProvider>> {
    if use_fake_embeddings(settings) {
        info!(dim = settings.dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dim)));
    }
    let dir = resolve_model_dir(settings.model_dir.as_deref())
        .map_err(|e| Error::Embedding(e.to_string()))?;
    let model = EmbeddingModel::load(&dir, settings.max_len)
        .map_err(|e| Error::Embedding(e.to_string()))?;
    if model.dim != settings.dim {
        return Err(Error::DimensionMismatch { expected: settings.dim, got: model.dim });
    }
    Ok(Box::new(model))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = chatrag_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        warn!(dir, "configured model dir does not exist");
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                return Ok(p);
            }
        }
    }
    for candidate in ["../models/all-MiniLM-L6-v2", "models/all-MiniLM-L6-v2"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!("Could not locate sentence embedding model directory"))
}
