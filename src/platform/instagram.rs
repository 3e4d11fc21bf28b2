//! Instagram Graph API client.
//!
//! The media node exposes likes and comments but not views or shares; those
//! counters are simply absent from the raw metrics.

use super::http::{raw_metrics, PacedHttp};
use super::{PlatformClient, RawMetrics};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const GRAPH_BASE: &str = "https://graph.facebook.com/v19.0";
const FIELDS: &str = "caption,timestamp,like_count,comments_count";

#[derive(Debug, Deserialize)]
struct Media {
    caption: Option<String>,
    timestamp: Option<String>,
    like_count: Option<u64>,
    comments_count: Option<u64>,
}

impl Media {
    fn metrics(&self) -> RawMetrics {
        raw_metrics([
            ("likes", self.like_count.map(Into::into)),
            ("comments", self.comments_count.map(Into::into)),
        ])
    }

    fn published_at(&self) -> Result<f64> {
        let raw = self
            .timestamp
            .as_deref()
            .ok_or_else(|| Error::Platform("instagram media has no timestamp".to_string()))?;
        // Graph API timestamps look like 2024-03-01T12:00:00+0000.
        let time = chrono::DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
            .map_err(|e| Error::Platform(format!("bad instagram timestamp {raw:?}: {e}")))?;
        #[allow(clippy::cast_precision_loss)]
        let secs = time.timestamp() as f64;
        Ok(secs)
    }
}

/// Client for Instagram media, authenticated with a Graph API access token.
pub struct InstagramClient {
    http: PacedHttp,
    access_token: String,
}

impl InstagramClient {
    pub(crate) fn new(http: PacedHttp, access_token: String) -> Self {
        Self { http, access_token }
    }

    async fn fetch_media(&self, post_id: &str) -> Result<Media> {
        debug!("Fetching instagram media {}", post_id);
        let request = self
            .http
            .client()
            .get(format!("{GRAPH_BASE}/{post_id}"))
            .query(&[("fields", FIELDS), ("access_token", self.access_token.as_str())]);
        self.http.send_json("instagram", request).await
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    fn platform(&self) -> &str {
        "instagram"
    }

    async fn authenticate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::Config(
                "instagram access token not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn get_post_metrics(&self, post_id: &str) -> Result<RawMetrics> {
        Ok(self.fetch_media(post_id).await?.metrics())
    }

    async fn get_post_text(&self, post_id: &str) -> Result<String> {
        Ok(self.fetch_media(post_id).await?.caption.unwrap_or_default())
    }

    async fn get_post_time(&self, post_id: &str) -> Result<f64> {
        self.fetch_media(post_id).await?.published_at()
    }
}
