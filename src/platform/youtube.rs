//! YouTube Data API v3 client.
//!
//! API Documentation: https://developers.google.com/youtube/v3/docs/videos/list

use super::http::{raw_metrics, PacedHttp};
use super::{PlatformClient, RawMetrics};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(default)]
    description: String,
}

/// Counters arrive as decimal strings, e.g. `"viewCount": "1024"`.
#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<serde_json::Value>,
    #[serde(rename = "likeCount")]
    like_count: Option<serde_json::Value>,
    #[serde(rename = "commentCount")]
    comment_count: Option<serde_json::Value>,
}

impl VideoListResponse {
    fn into_video(self, post_id: &str) -> Result<Video> {
        self.items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("youtube video {post_id}")))
    }
}

impl Video {
    fn metrics(self) -> RawMetrics {
        let Some(stats) = self.statistics else {
            return RawMetrics::new();
        };
        raw_metrics([
            ("views", stats.view_count),
            ("likes", stats.like_count),
            ("comments", stats.comment_count),
        ])
    }

    fn snippet(self) -> Result<Snippet> {
        self.snippet
            .ok_or_else(|| Error::Platform("youtube video has no snippet".to_string()))
    }
}

fn parse_published_at(published_at: &str) -> Result<f64> {
    let time = chrono::DateTime::parse_from_rfc3339(published_at)
        .map_err(|e| Error::Platform(format!("bad youtube publishedAt {published_at:?}: {e}")))?;
    #[allow(clippy::cast_precision_loss)]
    let secs = time.timestamp_millis() as f64 / 1000.0;
    Ok(secs)
}

/// Client for YouTube videos, authenticated with an API key.
pub struct YouTubeClient {
    http: PacedHttp,
    api_key: String,
}

impl YouTubeClient {
    pub(crate) fn new(http: PacedHttp, api_key: String) -> Self {
        Self { http, api_key }
    }

    async fn fetch_video(&self, post_id: &str, part: &str) -> Result<Video> {
        debug!("Fetching youtube video {} ({})", post_id, part);
        let request = self.http.client().get(format!("{API_BASE}/videos")).query(&[
            ("part", part),
            ("id", post_id),
            ("key", self.api_key.as_str()),
        ]);
        let response: VideoListResponse = self.http.send_json("youtube", request).await?;
        response.into_video(post_id)
    }
}

#[async_trait]
impl PlatformClient for YouTubeClient {
    fn platform(&self) -> &str {
        "youtube"
    }

    async fn authenticate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::Config("youtube API key not configured".to_string()));
        }
        Ok(())
    }

    async fn get_post_metrics(&self, post_id: &str) -> Result<RawMetrics> {
        Ok(self.fetch_video(post_id, "statistics").await?.metrics())
    }

    async fn get_post_text(&self, post_id: &str) -> Result<String> {
        Ok(self.fetch_video(post_id, "snippet").await?.snippet()?.description)
    }

    async fn get_post_time(&self, post_id: &str) -> Result<f64> {
        let snippet = self.fetch_video(post_id, "snippet").await?.snippet()?;
        parse_published_at(&snippet.published_at)
    }
}
