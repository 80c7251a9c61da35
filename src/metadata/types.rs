use serde::{Deserialize, Serialize};

use crate::semantic::{compose_content, ContentItem};

/// Channel counters as reported by the API. The API encodes them as strings
/// and omits `subscriberCount` for channels that hide it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    pub subscriber_count: Option<String>,
    pub view_count: Option<String>,
    pub video_count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub description: String,
    pub custom_url: Option<String>,
    pub statistics: ChannelStatistics,
}

/// One upload from a channel's uploads playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
}

impl Video {
    /// Text payload used for embedding. Empty when the video has neither a
    /// title nor a description.
    pub fn content_item(&self) -> ContentItem {
        let text = compose_content(&self.title, &self.description).unwrap_or_default();
        ContentItem::new(self.id.clone(), text)
    }
}

/// Errors from a metadata source.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("YouTube API key is not configured (set YOUTUBE_API_KEY)")]
    MissingApiKey,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API error {code}: {message}")]
    Api { code: u16, message: String },
}
