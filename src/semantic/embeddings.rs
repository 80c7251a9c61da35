//! Text embedding backends.
//!
//! - `EmbeddingModel`: fastembed model, downloaded on first use
//! - `HashEmbedder`: deterministic token hashing, no model needed
//!
//! Both sit behind the `Embedder` trait, which reports a missing embedding as
//! `None` instead of an error so callers can skip the item.

use fastembed::{InitOptions, TextEmbedding};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::SemanticConfig;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Model name that selects `HashEmbedder`
pub const HASH_MODEL: &str = "hash";

/// Text -> vector capability consumed by the retrieval service.
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns
    fn dimensions(&self) -> usize;

    /// Embed a text. `None` for empty/whitespace text or a backend failure;
    /// never a partial vector.
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Embed several texts. The output lines up with `texts` by position.
    ///
    /// The default fans `embed` out over the current rayon pool.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        texts.par_iter().map(|text| self.embed(text)).collect()
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Model download timed out after {0} seconds")]
    DownloadTimeout(u64),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

impl EmbeddingModel {
    /// Load a model by name, caching files under `cache_dir/models`.
    pub fn new(
        model_name: &str,
        cache_dir: &Path,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        log::info!(
            "Loading embedding model '{}' (download timeout {}s)",
            model_name,
            timeout.as_secs()
        );

        let mut model = with_timeout(timeout, move || {
            let options = InitOptions::new(model_enum)
                .with_cache_dir(models_dir)
                .with_show_download_progress(true);
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::InitFailed(e.to_string()))
        })?;

        let dimensions = Self::detect_dimensions(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Generate embeddings for multiple texts in one model call.
    pub fn try_embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    /// Generate an embedding for a single text.
    pub fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    /// Keep a model output only if it has the expected shape and finite values.
    fn accept(&self, v: Vec<f32>) -> Option<Vec<f32>> {
        if v.len() != self.dimensions {
            log::warn!(
                "embedding dropped: model returned {} dims, expected {}",
                v.len(),
                self.dimensions
            );
            return None;
        }
        if v.iter().any(|x| !x.is_finite()) {
            log::warn!("embedding dropped: non-finite component");
            return None;
        }
        Some(v)
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        // accept the HuggingFace-style "sentence-transformers/" prefix
        let short = name.rsplit('/').next().unwrap_or(name);
        match short.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q)
            }
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => {
                Ok(fastembed::EmbeddingModel::BGEBaseENV15Q)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 (add -q suffix for quantized), or '{}'",
                name, HASH_MODEL
            ))),
        }
    }

    /// Run one embedding to learn the output dimensions.
    fn detect_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to detect dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

/// Run `load` on a worker thread and give up after `timeout`.
///
/// On expiry the worker is left to finish in the background; its result is
/// dropped.
fn with_timeout<T, F>(timeout: Duration, load: F) -> Result<T, EmbeddingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("model-load".to_string())
        .spawn(move || {
            let _ = tx.send(load());
        })
        .map_err(|e| EmbeddingError::InitFailed(format!("Failed to spawn loader: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            log::error!("model load exceeded {}s", timeout.as_secs());
            Err(EmbeddingError::DownloadTimeout(timeout.as_secs()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(EmbeddingError::InitFailed(
            "model loader exited without a result".to_string(),
        )),
    }
}

impl Embedder for EmbeddingModel {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self.try_embed(text) {
            Ok(v) => self.accept(v),
            Err(e) => {
                log::warn!("embedding failed: {e}");
                None
            }
        }
    }

    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        let mut out = vec![None; texts.len()];
        let (positions, batch): (Vec<usize>, Vec<&str>) = texts
            .iter()
            .enumerate()
            .map(|(i, text)| (i, text.trim()))
            .filter(|(_, text)| !text.is_empty())
            .unzip();

        match self.try_embed_batch(&batch) {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (i, v) in positions.into_iter().zip(vectors) {
                    out[i] = self.accept(v);
                }
            }
            Ok(vectors) => log::warn!(
                "batch dropped: model returned {} embeddings for {} texts",
                vectors.len(),
                batch.len()
            ),
            Err(e) => log::warn!("batch embedding failed: {e}"),
        }
        out
    }
}

/// Deterministic embedder that hashes lowercase tokens into signed buckets
/// and L2-normalises the result. Texts sharing words end up close together.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let mut v = vec![0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return None;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            // every token cancelled out; still a valid, if uninformative, vector
            return Some(v);
        }
        Some(v.into_iter().map(|x| x / norm).collect())
    }
}

/// Build the embedder selected by config.
pub fn create_embedder(
    config: &SemanticConfig,
    base_path: &Path,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    if config.model.eq_ignore_ascii_case(HASH_MODEL) {
        log::info!("Using hash embedder ({} dims)", config.dimensions);
        return Ok(Arc::new(HashEmbedder::new(config.dimensions)));
    }

    let timeout = Duration::from_secs(config.download_timeout_secs);
    let model = EmbeddingModel::new(&config.model, base_path, Some(timeout))?;
    if model.dimensions != config.dimensions {
        log::warn!(
            "model '{}' produces {} dims but semantic.dimensions is {}; using the model's",
            model.name(),
            model.dimensions,
            config.dimensions
        );
    }
    Ok(Arc::new(model))
}
