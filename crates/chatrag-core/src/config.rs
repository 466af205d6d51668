//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (nested with `__`, e.g.
//! `APP_RETRIEVAL__K=5`). Provides helpers to expand `~` and `${VAR}` and to
//! resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Largest accepted RRF damping constant.
pub const MAX_K_RRF: usize = 1_000_000;

/// Position-embedding limit of BERT-family encoders.
pub const MAX_SEQUENCE_LEN: usize = 512;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub retrieval: RetrievalSettings,
    pub lexical: LexicalSettings,
    pub maintainer: MaintainerSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub uri: String,
    pub dense_table: String,
    pub sparse_table: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            uri: "./data/lancedb".to_string(),
            dense_table: "telegram_embeddings".to_string(),
            sparse_table: "telegram_bm25".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Fused results returned to the caller.
    pub k: usize,
    /// Candidates taken from each ranker before fusion.
    pub m: usize,
    pub k_rrf: usize,
    /// Upper bound on entries read from the sparse store per scan.
    pub scan_limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 10, m: 50, k_rrf: 60, scan_limit: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    pub k1: f32,
    pub b: f32,
    /// Snowball stemmer language, e.g. `russian` or `english`.
    pub language: String,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, language: "russian".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintainerSettings {
    pub interval_secs: u64,
}

impl Default for MaintainerSettings {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub fake: bool,
    pub dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, fake: false, dim: 384, max_len: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai".to_string(),
            model: "mistral-tiny".to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.retrieval.k == 0 {
            return invalid("retrieval.k must be positive".into());
        }
        if self.retrieval.m == 0 {
            return invalid("retrieval.m must be positive".into());
        }
        if self.retrieval.scan_limit == 0 {
            return invalid("retrieval.scan_limit must be positive".into());
        }
        if self.maintainer.interval_secs == 0 {
            return invalid("maintainer.interval_secs must be positive".into());
        }
        if self.retrieval.k_rrf > MAX_K_RRF {
            return invalid(format!(
                "retrieval.k_rrf must be at most {MAX_K_RRF}, got {}",
                self.retrieval.k_rrf
            ));
        }
        if self.embedding.dim == 0 {
            return invalid("embedding.dim must be positive".into());
        }
        if self.embedding.max_len == 0 || self.embedding.max_len > MAX_SEQUENCE_LEN {
            return invalid(format!(
                "embedding.max_len must be within 1..={MAX_SEQUENCE_LEN}, got {}",
                self.embedding.max_len
            ));
        }
        let LexicalSettings { k1, b, .. } = self.lexical;
        if !k1.is_finite() || k1 < 0.0 {
            return invalid(format!("lexical.k1 must be a non-negative number, got {k1}"));
        }
        if !b.is_finite() || !(0.0..=1.0).contains(&b) {
            return invalid(format!("lexical.b must be within [0, 1], got {b}"));
        }
        if self.storage.dense_table == self.storage.sparse_table {
            return invalid("storage.dense_table and storage.sparse_table must differ".into());
        }
        Ok(())
    }

    /// Storage location with `~` and env vars expanded.
    pub fn storage_path(&self) -> PathBuf {
        expand_path(&self.storage.uri)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
