// youtube.rs - YouTube Data API v3 client
// Searches the configured channel for videos and resolves the channel name for `status`.

use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;

use crate::error::SearchError;
use crate::related::{VideoResult, VideoSearch};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    pub subscriber_count: String,
    pub video_count: String,
}

pub fn channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{}", channel_id)
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

// ============================================================================
// API response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    subscriber_count: String,
    #[serde(default)]
    video_count: String,
}

fn videos_from(response: SearchResponse) -> Vec<VideoResult> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id?;
            Some(VideoResult {
                title: item.snippet.title,
                url: video_url(&id),
            })
        })
        .collect()
}

// ============================================================================
// Client
// ============================================================================

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    channel_id: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, channel_id: String) -> Self {
        Self {
            http,
            api_key,
            channel_id,
        }
    }

    fn api_key(&self) -> Result<&str, SearchError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SearchError::NotConfigured("YOUTUBE_API_KEY"))
    }

    pub async fn channel_info(&self) -> Result<ChannelInfo, SearchError> {
        let key = self.api_key()?;
        info!("[YOUTUBE] Fetching channel info for {}", self.channel_id);

        let response = self
            .http
            .get(format!("{}/channels", API_BASE))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", self.channel_id.as_str()),
                ("key", key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            error!("[YOUTUBE] Channel lookup failed: HTTP {}", response.status());
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: ChannelsResponse = response.json().await?;
        let item = body.items.into_iter().next().ok_or_else(|| {
            SearchError::Request(format!("channel not found: {}", self.channel_id))
        })?;
        Ok(ChannelInfo {
            id: self.channel_id.clone(),
            title: item.snippet.title,
            subscriber_count: item.statistics.subscriber_count,
            video_count: item.statistics.video_count,
        })
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search_videos(
        &self,
        keywords: &[String],
        max_results: u32,
    ) -> Result<Vec<VideoResult>, SearchError> {
        let key = self.api_key()?;
        let query = keywords.join(" ");
        let max_results = max_results.to_string();
        info!("[YOUTUBE] Searching videos for: {}", query);

        let response = self
            .http
            .get(format!("{}/search", API_BASE))
            .query(&[
                ("part", "snippet"),
                ("channelId", self.channel_id.as_str()),
                ("q", query.as_str()),
                ("type", "video"),
                ("order", "relevance"),
                ("maxResults", max_results.as_str()),
                ("key", key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            error!("[YOUTUBE] Video search failed: HTTP {}", response.status());
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let videos = videos_from(response.json().await?);
        info!("[YOUTUBE] Found {} videos", videos.len());
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_to_videos() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "items": [
                    {"id": {"kind": "youtube#video", "videoId": "abc123"}, "snippet": {"title": "Nginx setup"}},
                    {"id": {"kind": "youtube#channel", "channelId": "UC1"}, "snippet": {"title": "A channel"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            videos_from(body),
            vec![VideoResult {
                title: "Nginx setup".to_string(),
                url: "https://www.youtube.com/watch?v=abc123".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_search_response() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(videos_from(body).is_empty());
    }

    #[test]
    fn test_channel_response_shape() {
        let body: ChannelsResponse = serde_json::from_str(
            r#"{"items": [{"snippet": {"title": "Docs TV", "description": "d"},
                           "statistics": {"subscriberCount": "1200", "videoCount": "85"}}]}"#,
        )
        .unwrap();
        let item = &body.items[0];
        assert_eq!(item.snippet.title, "Docs TV");
        assert_eq!(item.statistics.subscriber_count, "1200");
        assert_eq!(channel_url("UC1"), "https://www.youtube.com/channel/UC1");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = YouTubeClient::new(reqwest::Client::new(), None, "UC1".to_string());
        assert!(matches!(
            client.search_videos(&["nginx".to_string()], 3).await,
            Err(SearchError::NotConfigured("YOUTUBE_API_KEY"))
        ));
        assert!(client.channel_info().await.is_err());
    }
}
