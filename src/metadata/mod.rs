pub mod identifier;
pub mod types;
pub mod youtube;

pub use identifier::{extract_channel_from_text, normalize_identifier, ChannelRef};
pub use types::{Channel, ChannelStatistics, MetadataError, Video};
pub use youtube::YouTubeClient;

/// Where channel and upload metadata comes from.
pub trait MetadataSource: Send + Sync {
    /// Look up a channel by id, handle, URL or name. `Ok(None)` when nothing
    /// matches.
    fn resolve_channel(&self, query: &str) -> Result<Option<Channel>, MetadataError>;

    /// Most recent uploads, newest first.
    fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<Video>, MetadataError>;
}
