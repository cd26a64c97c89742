//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars. Provides helpers to expand `~` and `${VAR}` and to
//! resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Everything the build pipeline and query service need, passed explicitly
/// into each component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub corpus_root: String,
    pub output_root: String,
    /// Maximum characters per chunk (a single longer sentence may exceed it).
    pub chunk_size: usize,
    /// Overlap budget; `chunk_overlap / 10` trailing words are carried over.
    pub chunk_overlap: usize,
    pub model_name: String,
    pub top_k_default: usize,
    /// Explicit model directory; defaults to `<models_root>/<model_name>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    pub models_root: String,
    /// Accepts `true`/`false`, `1`/`0` (so `APP_USE_FAKE_EMBEDDINGS=1` works).
    #[serde(deserialize_with = "flexible_bool")]
    pub use_fake_embeddings: bool,
    pub embed_batch_size: usize,
    pub max_seq_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_root: "../data/hybrid".to_string(),
            output_root: "../data/vector_db".to_string(),
            chunk_size: 512,
            chunk_overlap: 128,
            model_name: "all-MiniLM-L6-v2".to_string(),
            top_k_default: 5,
            model_dir: None,
            models_root: "models".to_string(),
            use_fake_embeddings: false,
            embed_batch_size: 32,
            max_seq_len: 256,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k_default == 0 {
            return Err(Error::InvalidConfig("top_k_default must be > 0".into()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("embed_batch_size must be > 0".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(Error::InvalidConfig("model_name is empty".into()));
        }
        Ok(())
    }

    pub fn corpus_root_path(&self) -> PathBuf {
        expand_path(&self.corpus_root)
    }

    pub fn output_root_path(&self) -> PathBuf {
        expand_path(&self.output_root)
    }

    /// Directory holding `config.json`, `tokenizer.json` and weights for
    /// `model_name`.
    pub fn model_dir_path(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => expand_path(dir),
            None => expand_path(&self.models_root).join(&self.model_name),
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already assembled figment (defaults are still layered first).
    pub fn from_figment(figment: Figment) -> Self {
        let figment = Figment::from(Serialized::defaults(PipelineConfig::default())).merge(figment);
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let cfg: PipelineConfig = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let cfg = self.pipeline()?;
        match env {
            "prod" | "production" if cfg.use_fake_embeddings => {
                anyhow::bail!("use_fake_embeddings is not allowed in production")
            }
            _ => {}
        }
        Ok(())
    }
}

fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct FlexibleBool;

    impl serde::de::Visitor<'_> for FlexibleBool {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a boolean, 0/1, or \"true\"/\"false\"")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> std::result::Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<bool, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                other => Err(E::custom(format!("invalid boolean {:?}", other))),
            }
        }
    }

    deserializer.deserialize_any(FlexibleBool)
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
