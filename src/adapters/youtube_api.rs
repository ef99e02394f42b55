use crate::adapters::http::build_client;
use crate::domain::model::{VideoDetails, VideoId};
use crate::domain::ports::{ConfigProvider, VideoDetailsProvider};
use crate::utils::error::{Result, ServerError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const VIDEO_PARTS: &str = "snippet,statistics,contentDetails";

#[derive(Debug, Default, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoItem {
    snippet: Snippet,
    statistics: Statistics,
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    description: String,
    channel_title: String,
    published_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentDetails {
    duration: String,
}

impl From<VideoItem> for VideoDetails {
    fn from(item: VideoItem) -> Self {
        let count = |value: Option<String>| value.unwrap_or_else(|| "0".to_string());

        VideoDetails {
            title: item.snippet.title,
            description: item.snippet.description,
            channel_title: item.snippet.channel_title,
            published_at: item.snippet.published_at,
            duration: item.content_details.duration,
            view_count: count(item.statistics.view_count),
            like_count: count(item.statistics.like_count),
            comment_count: count(item.statistics.comment_count),
        }
    }
}

/// YouTube Data API v3 用戶端
pub struct YoutubeDataClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl YoutubeDataClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout(), None)?,
            api_base: config.api_base().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        })
    }
}

#[async_trait]
impl VideoDetailsProvider for YoutubeDataClient {
    async fn video_details(&self, video_id: &VideoId) -> Result<VideoDetails> {
        let url = format!("{}/videos", self.api_base);
        tracing::debug!("Making YouTube Data API request to: {} (id={})", url, video_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", VIDEO_PARTS),
                ("id", video_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        tracing::debug!("YouTube Data API response status: {}", response.status());

        if response.status() != StatusCode::OK {
            return Err(ServerError::YoutubeApiStatus {
                status: response.status().as_u16(),
            });
        }

        let data: VideoListResponse = response.json().await?;

        data.items
            .into_iter()
            .next()
            .map(VideoDetails::from)
            .ok_or_else(|| ServerError::VideoNotFound {
                video_id: video_id.to_string(),
            })
    }
}
