use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::errors::AppError;
use crate::metadata::{extract_channel_from_text, Channel, MetadataSource, Video};
use crate::semantic::{ContentItem, NeighborResult, RetrievalService};
use crate::summary::{build_prompt, parse_report, ReportBody, Summarizer, SummaryError};

/// Per-call overrides. `None` falls back to the configured defaults.
#[derive(Debug, Clone)]
pub struct AnalyzeOpts {
    pub top_k: Option<usize>,
    pub max_items: Option<usize>,
    pub summarize: bool,
}

impl Default for AnalyzeOpts {
    fn default() -> Self {
        Self {
            top_k: None,
            max_items: None,
            summarize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub channel: Channel,
    /// Every fetched upload; only the first `max_items` are indexed and
    /// sent to the summarizer
    pub videos: Vec<Video>,
    pub stored: usize,
    pub neighbors: Vec<NeighborResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportBody>,
    /// Set when report generation failed; the rest of the analysis is intact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Extract an identifier from free text and look the channel up.
pub fn resolve_channel(source: &dyn MetadataSource, query: &str) -> Result<Channel, AppError> {
    let identifier = extract_channel_from_text(query);
    if identifier.is_empty() {
        return Err(AppError::EmptyQuery);
    }

    source
        .resolve_channel(&identifier)?
        .ok_or(AppError::ChannelNotFound(identifier))
}

/// Resolve -> fetch -> embed/index -> retrieve -> summarise.
pub struct ChannelAnalyzer {
    metadata: Arc<dyn MetadataSource>,
    retrieval: Arc<RetrievalService>,
    summarizer: Option<Arc<dyn Summarizer>>,
    max_results: u32,
    max_items: usize,
    top_k: usize,
}

impl ChannelAnalyzer {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        retrieval: Arc<RetrievalService>,
        summarizer: Option<Arc<dyn Summarizer>>,
        max_results: u32,
        max_items: usize,
        top_k: usize,
    ) -> Self {
        Self {
            metadata,
            retrieval,
            summarizer,
            max_results,
            max_items,
            top_k,
        }
    }

    pub fn resolve(&self, query: &str) -> Result<Channel, AppError> {
        resolve_channel(self.metadata.as_ref(), query)
    }

    pub fn analyze(&self, query: &str, opts: &AnalyzeOpts) -> Result<Analysis, AppError> {
        let span = tracing::info_span!("analyze", query = %query.trim());
        let _guard = span.enter();

        let channel = self.resolve(query)?;
        let videos = self.metadata.recent_videos(&channel.id, self.max_results)?;

        let max_items = opts.max_items.unwrap_or(self.max_items);
        let top_k = opts.top_k.unwrap_or(self.top_k);

        let items: Vec<ContentItem> = videos.iter().map(Video::content_item).collect();
        let retrieval = self
            .retrieval
            .build_and_retrieve(&items, &channel.title, max_items, top_k)?;

        log::info!(
            "channel={} videos={} stored={} neighbors={}",
            channel.id,
            videos.len(),
            retrieval.stored,
            retrieval.neighbors.len()
        );

        let (report, error) = if opts.summarize {
            let sample = &videos[..videos.len().min(max_items)];
            self.summarize(&channel, sample, &retrieval.neighbors)
        } else {
            (None, None)
        };

        Ok(Analysis {
            channel,
            videos,
            stored: retrieval.stored,
            neighbors: retrieval.neighbors,
            report,
            error,
            generated_at: Utc::now(),
        })
    }

    /// Report generation never fails the analysis; errors are returned as text.
    fn summarize(
        &self,
        channel: &Channel,
        videos: &[Video],
        neighbors: &[NeighborResult],
    ) -> (Option<ReportBody>, Option<String>) {
        let Some(summarizer) = &self.summarizer else {
            return (None, Some(SummaryError::MissingApiKey.to_string()));
        };

        let prompt = build_prompt(channel, videos, neighbors);
        match summarizer.generate(&prompt) {
            Ok(raw) => (Some(parse_report(&raw)), None),
            Err(e) => {
                log::error!("LLM call failed: {e}");
                (None, Some(format!("LLM call failed: {e}")))
            }
        }
    }
}
