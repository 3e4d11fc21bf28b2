//! TikTok Display API client.
//!
//! API Documentation: https://developers.tiktok.com/doc/tiktok-api-v2-video-query

use super::http::{raw_metrics, PacedHttp};
use super::{PlatformClient, RawMetrics};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const QUERY_URL: &str = "https://open.tiktokapis.com/v2/video/query/";
const FIELDS: &str =
    "id,create_time,video_description,view_count,like_count,comment_count,share_count";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: Option<QueryData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Video {
    create_time: Option<i64>,
    video_description: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    share_count: Option<u64>,
}

impl QueryResponse {
    fn into_video(self, post_id: &str) -> Result<Video> {
        if let Some(error) = self.error {
            if error.code != "ok" {
                return Err(Error::Platform(format!(
                    "tiktok error {}: {}",
                    error.code, error.message
                )));
            }
        }
        self.data
            .and_then(|data| data.videos.into_iter().next())
            .ok_or_else(|| Error::NotFound(format!("tiktok video {post_id}")))
    }
}

impl Video {
    fn metrics(&self) -> RawMetrics {
        raw_metrics([
            ("views", self.view_count.map(Into::into)),
            ("likes", self.like_count.map(Into::into)),
            ("comments", self.comment_count.map(Into::into)),
            ("shares", self.share_count.map(Into::into)),
        ])
    }
}

/// Client for TikTok videos, authenticated with a user access token.
pub struct TikTokClient {
    http: PacedHttp,
    access_token: String,
}

impl TikTokClient {
    pub(crate) fn new(http: PacedHttp, access_token: String) -> Self {
        Self { http, access_token }
    }

    async fn fetch_video(&self, post_id: &str) -> Result<Video> {
        debug!("Fetching tiktok video {}", post_id);
        let request = self
            .http
            .client()
            .post(QUERY_URL)
            .query(&[("fields", FIELDS)])
            .bearer_auth(&self.access_token)
            .json(&json!({ "filters": { "video_ids": [post_id] } }));
        let response: QueryResponse = self.http.send_json("tiktok", request).await?;
        response.into_video(post_id)
    }
}

#[async_trait]
impl PlatformClient for TikTokClient {
    fn platform(&self) -> &str {
        "tiktok"
    }

    async fn authenticate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::Config("tiktok access token not configured".to_string()));
        }
        Ok(())
    }

    async fn get_post_metrics(&self, post_id: &str) -> Result<RawMetrics> {
        Ok(self.fetch_video(post_id).await?.metrics())
    }

    async fn get_post_text(&self, post_id: &str) -> Result<String> {
        Ok(self
            .fetch_video(post_id)
            .await?
            .video_description
            .unwrap_or_default())
    }

    async fn get_post_time(&self, post_id: &str) -> Result<f64> {
        let video = self.fetch_video(post_id).await?;
        let created = video
            .create_time
            .ok_or_else(|| Error::Platform(format!("tiktok video {post_id} has no create_time")))?;
        #[allow(clippy::cast_precision_loss)]
        let secs = created as f64;
        Ok(secs)
    }
}
