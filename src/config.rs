use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::semantic::IndexParams;

const CONFIG_FILE: &str = "config.yaml";

/// Default embedding model (384 dims, matches the default dimension below)
const DEFAULT_SEMANTIC_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_DIMENSIONS: usize = 384;
const DEFAULT_CAPACITY: usize = 5000;
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Videos embedded per analysis
const DEFAULT_MAX_ITEMS: usize = 12;
const DEFAULT_TOP_K: usize = 5;

const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
/// Upper bound the Data API accepts for maxResults
pub const YOUTUBE_MAX_RESULTS_LIMIT: u32 = 50;

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";

/// YouTube Data API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// API key; `YOUTUBE_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_youtube_base_url")]
    pub base_url: String,

    /// Recent uploads fetched per channel
    #[serde(default = "default_youtube_max_results")]
    pub max_results: u32,

    #[serde(default = "default_youtube_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_youtube_base_url(),
            max_results: default_youtube_max_results(),
            timeout_secs: default_youtube_timeout_secs(),
        }
    }
}

fn default_youtube_base_url() -> String {
    DEFAULT_YOUTUBE_BASE_URL.to_string()
}

fn default_youtube_max_results() -> u32 {
    25
}

fn default_youtube_timeout_secs() -> u64 {
    20
}

/// Embedding and index settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2"), or "hash"
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Vector length the index is built for
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum number of vectors the index can hold
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_m")]
    pub m: usize,

    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    #[serde(default = "default_ef_search")]
    pub ef_search: usize,

    /// Index sizes below this are searched exhaustively
    #[serde(default = "default_exhaustive_threshold")]
    pub exhaustive_threshold: usize,

    /// Seed for the graph level generator
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Parallelism for embedding generation: "auto" or a positive integer
    #[serde(default = "default_embedding_parallelism")]
    pub embedding_parallelism: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Videos embedded per analysis; the rest are ignored
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Neighbors retrieved for the channel anchor
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        let params = IndexParams::default();
        Self {
            model: default_semantic_model(),
            dimensions: DEFAULT_DIMENSIONS,
            capacity: DEFAULT_CAPACITY,
            m: params.m,
            ef_construction: params.ef_construction,
            ef_search: params.ef_search,
            exhaustive_threshold: params.exhaustive_threshold,
            seed: params.seed,
            embedding_parallelism: default_embedding_parallelism(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_items: DEFAULT_MAX_ITEMS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl SemanticConfig {
    pub fn index_params(&self) -> IndexParams {
        IndexParams {
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            exhaustive_threshold: self.exhaustive_threshold,
            seed: self.seed,
        }
    }

    /// Resolve `embedding_parallelism` to a thread count.
    pub fn embedding_threads(&self) -> usize {
        match self.embedding_parallelism.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_SEMANTIC_MODEL.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_m() -> usize {
    IndexParams::default().m
}

fn default_ef_construction() -> usize {
    IndexParams::default().ef_construction
}

fn default_ef_search() -> usize {
    IndexParams::default().ef_search
}

fn default_exhaustive_threshold() -> usize {
    IndexParams::default().exhaustive_threshold
}

fn default_seed() -> u64 {
    IndexParams::default().seed
}

fn default_embedding_parallelism() -> String {
    "auto".to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Chat-completion backend used for the report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; `GROQ_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Prompts longer than this are clipped before sending
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_prompt_chars: default_max_prompt_chars(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.15
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_max_prompt_chars() -> usize {
    7000
}

fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let sem = &self.semantic;
        if sem.dimensions == 0 {
            bail!("semantic.dimensions must be greater than 0");
        }
        if sem.capacity == 0 {
            bail!("semantic.capacity must be greater than 0");
        }
        if sem.m < 2 {
            bail!("semantic.m must be at least 2, got {}", sem.m);
        }
        if sem.ef_construction == 0 || sem.ef_search == 0 {
            bail!("semantic.ef_construction and semantic.ef_search must be greater than 0");
        }
        if sem.top_k == 0 {
            bail!("semantic.top_k must be greater than 0");
        }

        // "auto" or positive integer
        if sem.embedding_parallelism != "auto" {
            match sem.embedding_parallelism.parse::<u32>() {
                Ok(0) | Err(_) => bail!(
                    "semantic.embedding_parallelism must be 'auto' or a positive integer, got '{}'",
                    sem.embedding_parallelism
                ),
                Ok(_) => {}
            }
        }

        if sem.download_timeout_secs == 0 {
            bail!("semantic.download_timeout_secs must be greater than 0");
        }

        let yt = &self.youtube;
        if yt.max_results == 0 || yt.max_results > YOUTUBE_MAX_RESULTS_LIMIT {
            bail!(
                "youtube.max_results must be between 1 and {}, got {}",
                YOUTUBE_MAX_RESULTS_LIMIT,
                yt.max_results
            );
        }
        if yt.timeout_secs == 0 {
            bail!("youtube.timeout_secs must be greater than 0");
        }

        let llm = &self.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            bail!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                llm.temperature
            );
        }
        if llm.max_prompt_chars == 0 {
            bail!("llm.max_prompt_chars must be greater than 0");
        }
        if llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults when
    /// missing. API keys from the environment override the file.
    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            std::fs::create_dir_all(base_path)
                .with_context(|| format!("creating {}", base_path.display()))?;
            let default = serde_yml::to_string(&Self::default())?;
            std::fs::write(&path, default)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("created default config at {}", path.display());
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("{} is malformed", path.display()))?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        config.apply_env();

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Environment keys win over the file but are never written back.
    fn apply_env(&mut self) {
        if let Some(key) = env_non_empty("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(key) = env_non_empty("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
