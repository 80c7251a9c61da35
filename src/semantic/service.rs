//! Retrieval service: embeds a batch of content items, stores them in the
//! embedding index and queries it with an anchor text.
//!
//! - Each batch goes to the embedder in one `embed_batch` call, run on a
//!   bounded rayon pool
//! - Inserts are serialised behind the write half of an `RwLock`
//! - Queries share the read half, so they never overlap an insert

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::semantic::embeddings::Embedder;
use crate::semantic::index::{EmbeddingIndex, IndexError, NeighborResult};

/// Errors that can occur during retrieval.
///
/// Per-item embedding misses are not errors; only structural index failures
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One piece of content to index: an external id and its text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub text: String,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Outcome of `build_and_retrieve`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Retrieval {
    /// Items from this batch that were embedded and inserted
    pub stored: usize,
    /// Anchor neighbors, nearest first
    pub neighbors: Vec<NeighborResult>,
}

/// Owns the process-wide index and the embedder feeding it.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    index: RwLock<EmbeddingIndex>,
    pool: rayon::ThreadPool,
}

impl RetrievalService {
    /// `parallelism` bounds the number of concurrent embedding calls.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: EmbeddingIndex,
        parallelism: usize,
    ) -> Result<Self, RetrievalError> {
        if embedder.dimensions() != index.dimensions() {
            log::warn!(
                "embedder produces {} dims, index expects {}; inserts will fail",
                embedder.dimensions(),
                index.dimensions()
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .thread_name(|i| format!("embed-{i}"))
            .build()
            .map_err(|e| RetrievalError::Internal(format!("Failed to build embedding pool: {e}")))?;

        Ok(Self {
            embedder,
            index: RwLock::new(index),
            pool,
        })
    }

    /// Embed up to `max_items` items, insert them, then query the index with
    /// the anchor's embedding for `k` neighbors.
    ///
    /// Truncation is lossy on purpose: items past `max_items` are ignored.
    /// Items without an embedding are skipped. Index failures abort the call.
    pub fn build_and_retrieve(
        &self,
        items: &[ContentItem],
        anchor_text: &str,
        max_items: usize,
        k: usize,
    ) -> Result<Retrieval, RetrievalError> {
        let sample = &items[..items.len().min(max_items)];
        if items.len() > sample.len() {
            log::debug!(
                "retrieval batch truncated from {} to {} items",
                items.len(),
                sample.len()
            );
        }

        let texts: Vec<&str> = sample.iter().map(|item| item.text.as_str()).collect();
        let embeddings = self.pool.install(|| self.embedder.embed_batch(&texts));
        if embeddings.len() != sample.len() {
            return Err(RetrievalError::Internal(format!(
                "embedder returned {} results for {} items",
                embeddings.len(),
                sample.len()
            )));
        }

        let mut stored = 0;
        let indexed_total = {
            let mut index = self
                .index
                .write()
                .map_err(|e| RetrievalError::Internal(format!("Lock poisoned: {}", e)))?;

            for (item, embedding) in sample.iter().zip(embeddings) {
                match embedding {
                    Some(vector) => {
                        index.insert(&vector, item.id.as_str())?;
                        stored += 1;
                    }
                    None => log::debug!("no embedding for item {}, skipped", item.id),
                }
            }
            index.len()
        };

        log::info!(
            "stored={} skipped={} indexed_total={}",
            stored,
            sample.len() - stored,
            indexed_total
        );

        let neighbors = self.neighbors_of(anchor_text, k)?;

        Ok(Retrieval { stored, neighbors })
    }

    /// Nearest neighbors of a text. Empty when the text is blank or cannot
    /// be embedded.
    pub fn neighbors_of(&self, text: &str, k: usize) -> Result<Vec<NeighborResult>, RetrievalError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let Some(seed) = self.embedder.embed(text) else {
            log::debug!("anchor text has no embedding, no neighbors");
            return Ok(Vec::new());
        };

        let index = self
            .index
            .read()
            .map_err(|e| RetrievalError::Internal(format!("Lock poisoned: {}", e)))?;

        Ok(index.query(&seed, k)?)
    }

    /// Number of vectors currently in the index.
    pub fn indexed_count(&self) -> Result<usize, RetrievalError> {
        let index = self
            .index
            .read()
            .map_err(|e| RetrievalError::Internal(format!("Lock poisoned: {}", e)))?;
        Ok(index.len())
    }
}
