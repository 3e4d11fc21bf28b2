//! Shared HTTP plumbing for platform clients.

use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// HTTP client paired with a pacing limiter.
///
/// Clones share both the connection pool and the limiter.
#[derive(Clone)]
pub(crate) struct PacedHttp {
    client: Client,
    /// `None` when pacing is disabled (zero interval).
    pacer: Option<Arc<DefaultDirectRateLimiter>>,
}

impl PacedHttp {
    pub(crate) fn new(config: &PlatformConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("tensorflix-core/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let pacer = Quota::with_period(config.min_call_interval())
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Ok(Self { client, pacer })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Wait for the pacer, send `request` and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        platform: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("{} API responded with {}", platform, status);

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{platform} post")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("{platform} API quota exhausted")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Platform(format!(
                "{platform} API returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

/// Build a `RawMetrics` map from optional counters.
pub(crate) fn raw_metrics<I>(fields: I) -> super::RawMetrics
where
    I: IntoIterator<Item = (&'static str, Option<serde_json::Value>)>,
{
    fields
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect()
}
