use crate::metadata::MetadataError;
use crate::semantic::{EmbeddingError, RetrievalError};
use crate::summary::SummaryError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("no channel identifier in query")]
    EmptyQuery,

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("summary error: {0}")]
    Summary(#[from] SummaryError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
