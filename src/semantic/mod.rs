//! Embedding and nearest-neighbor retrieval.
//!
//! # Architecture
//!
//! - `embeddings`: text -> vector backends (fastembed, token hashing)
//! - `hnsw`: layered proximity graph used for large collections
//! - `index`: fixed-capacity index mapping external ids to vectors
//! - `preprocess`: builds the embedded text for a video
//! - `service`: batch embed + insert + anchor query

pub mod embeddings;
mod hnsw;
mod index;
mod preprocess;
mod service;

pub use embeddings::{create_embedder, Embedder, EmbeddingError, EmbeddingModel, HashEmbedder};
pub use index::{EmbeddingIndex, IndexError, IndexParams, NeighborResult};
pub use preprocess::{compose_content, snippet};
pub use service::{ContentItem, Retrieval, RetrievalError, RetrievalService};
