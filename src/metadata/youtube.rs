use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::YoutubeConfig;
use crate::metadata::identifier::{normalize_identifier, ChannelRef};
use crate::metadata::types::{Channel, ChannelStatistics, MetadataError, Video};
use crate::metadata::MetadataSource;

/// Candidates requested from the channel search endpoint
const SEARCH_MAX_RESULTS: &str = "5";

/// Blocking client for the YouTube Data API v3. Metadata only: no video
/// statistics, no transcripts.
pub struct YouTubeClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(config: &YoutubeConfig) -> Result<Self, MetadataError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(MetadataError::MissingApiKey)?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MetadataError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("youtube GET {url} params={params:?}");

        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(resp.json::<T>()?)
    }

    fn channel_by_handle(&self, handle: &str) -> Result<Option<Channel>, MetadataError> {
        let resp: ListResponse<ChannelResource> = self.get(
            "channels",
            &[("part", "snippet,statistics,contentDetails"), ("forHandle", handle)],
        )?;
        Ok(resp.items.into_iter().next().map(Channel::from))
    }

    fn channel_by_id(&self, id: &str) -> Result<Option<Channel>, MetadataError> {
        let resp: ListResponse<ChannelResource> = self.get(
            "channels",
            &[("part", "snippet,statistics,brandingSettings,contentDetails"), ("id", id)],
        )?;
        Ok(resp.items.into_iter().next().map(Channel::from))
    }

    fn search_channel(&self, query: &str) -> Result<Option<Channel>, MetadataError> {
        let resp: ListResponse<SearchResult> = self.get(
            "search",
            &[
                ("part", "snippet"),
                ("type", "channel"),
                ("q", query),
                ("maxResults", SEARCH_MAX_RESULTS),
            ],
        )?;

        match resp.items.into_iter().find_map(|item| item.id.channel_id) {
            Some(id) => self.channel_by_id(&id),
            None => Ok(None),
        }
    }

    fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>, MetadataError> {
        let resp: ListResponse<ChannelResource> =
            self.get("channels", &[("part", "contentDetails"), ("id", channel_id)])?;

        Ok(resp
            .items
            .into_iter()
            .next()
            .and_then(|c| c.content_details)
            .and_then(|d| d.related_playlists.uploads))
    }
}

impl MetadataSource for YouTubeClient {
    fn resolve_channel(&self, query: &str) -> Result<Option<Channel>, MetadataError> {
        let channel = match normalize_identifier(query) {
            ChannelRef::Id(id) => {
                log::info!("resolving channel id={id}");
                self.channel_by_id(&id)?
            }
            ChannelRef::Handle(handle) => {
                log::info!("resolving channel handle=@{handle}");
                match self.channel_by_handle(&handle)? {
                    Some(c) => Some(c),
                    None => self.search_channel(&format!("@{handle}"))?,
                }
            }
            ChannelRef::Name(name) => {
                log::info!("searching channel name={name}");
                self.search_channel(&name)?
            }
        };

        if let Some(c) = &channel {
            log::info!("resolved channel id={} title={}", c.id, c.title);
        }
        Ok(channel)
    }

    fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<Video>, MetadataError> {
        let Some(playlist_id) = self.uploads_playlist(channel_id)? else {
            log::warn!("channel {channel_id} has no uploads playlist");
            return Ok(Vec::new());
        };

        let max_results = max_results.to_string();
        let resp: ListResponse<PlaylistItem> = self.get(
            "playlistItems",
            &[
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id.as_str()),
                ("maxResults", max_results.as_str()),
            ],
        )?;

        let videos: Vec<Video> = resp.items.into_iter().filter_map(Video::from_item).collect();
        log::info!("fetched videos={} channel={channel_id}", videos.len());
        Ok(videos)
    }
}

fn api_error(status: u16, body: &str) -> MetadataError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => MetadataError::Api {
            code: parsed.error.code.unwrap_or(status),
            message: parsed.error.message,
        },
        Err(_) => MetadataError::Api {
            code: status,
            message: body.chars().take(200).collect(),
        },
    }
}

// API response shapes. Only the fields we read are declared.

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: StatisticsResource,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    custom_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsResource {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    #[serde(default)]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: PlaylistSnippet,
    content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: Option<String>,
}

impl From<ChannelResource> for Channel {
    fn from(res: ChannelResource) -> Self {
        Channel {
            id: res.id,
            title: res.snippet.title,
            description: res.snippet.description,
            custom_url: res.snippet.custom_url,
            statistics: ChannelStatistics {
                subscriber_count: res.statistics.subscriber_count,
                view_count: res.statistics.view_count,
                video_count: res.statistics.video_count,
            },
        }
    }
}

impl Video {
    /// Items without a video id (deleted or private uploads) are dropped.
    fn from_item(item: PlaylistItem) -> Option<Self> {
        let id = item.content_details.and_then(|d| d.video_id)?;
        Some(Video {
            id,
            title: item.snippet.title,
            description: item.snippet.description,
            published_at: item.snippet.published_at,
        })
    }
}
