use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use homedir::my_home;

use crate::{
    app::{analyzer::ChannelAnalyzer, errors::AppError},
    config::Config,
    metadata::{MetadataSource, YouTubeClient},
    semantic::{create_embedder, EmbeddingIndex, RetrievalService},
    summary::{GroqClient, Summarizer},
};

/// Builds the process-wide services once and wires them together.
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> anyhow::Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    pub fn create_config(paths: &AppPaths) -> anyhow::Result<Config> {
        Config::load_with(&paths.base_path)
    }

    /// Embedder plus an empty index sized from config.
    pub fn create_retrieval_service(config: &Config) -> Result<Arc<RetrievalService>, AppError> {
        let sem = &config.semantic;
        let embedder = create_embedder(sem, config.base_path())?;

        // the embedder's real output size wins over the configured one
        let index = EmbeddingIndex::with_params(
            embedder.dimensions(),
            sem.capacity,
            sem.index_params(),
        )
        .map_err(crate::semantic::RetrievalError::from)?;

        let service = RetrievalService::new(embedder, index, sem.embedding_threads())?;
        Ok(Arc::new(service))
    }

    pub fn create_metadata_source(config: &Config) -> Result<Arc<dyn MetadataSource>, AppError> {
        Ok(Arc::new(YouTubeClient::new(&config.youtube)?))
    }

    pub fn create_llm_client(config: &Config) -> Result<GroqClient, AppError> {
        Ok(GroqClient::new(&config.llm)?)
    }

    /// `None` when no LLM key is configured; analyses then skip the report.
    pub fn create_summarizer(config: &Config) -> Option<Arc<dyn Summarizer>> {
        match GroqClient::new(&config.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                log::warn!("report generation disabled: {e}");
                None
            }
        }
    }

    pub fn create_analyzer(config: &Config) -> Result<ChannelAnalyzer, AppError> {
        let metadata = Self::create_metadata_source(config)?;
        let retrieval = Self::create_retrieval_service(config)?;
        let summarizer = Self::create_summarizer(config);

        Ok(ChannelAnalyzer::new(
            metadata,
            retrieval,
            summarizer,
            config.youtube.max_results,
            config.semantic.max_items,
            config.semantic.top_k,
        ))
    }

    /// `$CHANLENS_BASE_PATH`, or `~/.local/share/chanlens`
    fn get_base_path() -> anyhow::Result<PathBuf> {
        if let Ok(path) = std::env::var("CHANLENS_BASE_PATH") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = my_home()
            .map_err(|e| anyhow::anyhow!("Could not determine home directory: {e:?}"))?
            .context("Home directory path is empty")?;

        Ok(home.join(".local/share/chanlens"))
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: PathBuf,
}
