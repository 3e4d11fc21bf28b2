//! Fail-soft collection of raw engagement metrics.

use crate::error::{Error, Result};
use crate::platform::{PlatformRegistry, RawMetrics};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches raw engagement counters from a registered platform.
///
/// Any failure (unknown platform, authentication, transport, payload)
/// yields empty metrics so one platform outage does not stop processing.
pub struct EngagementMetricsCollector {
    registry: Arc<PlatformRegistry>,
}

impl EngagementMetricsCollector {
    /// Create a collector resolving clients from `registry`.
    #[must_use]
    pub fn new(registry: Arc<PlatformRegistry>) -> Self {
        Self { registry }
    }

    /// Raw metrics for a post, or an empty map on any failure.
    pub async fn collect(&self, post_id: &str, platform: &str) -> RawMetrics {
        match self.try_collect(post_id, platform).await {
            Ok(metrics) => {
                debug!(
                    "Collected {} metric fields for {} on {}",
                    metrics.len(),
                    post_id,
                    platform
                );
                metrics
            }
            Err(e) => {
                warn!(
                    "Metrics collection failed for {} on {}: {}",
                    post_id, platform, e
                );
                RawMetrics::new()
            }
        }
    }

    /// Raw metrics for a post, reporting the failure cause.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown platform, or the client's
    /// error if authentication or the fetch fails.
    pub async fn try_collect(&self, post_id: &str, platform: &str) -> Result<RawMetrics> {
        let client = self
            .registry
            .resolve(platform)
            .ok_or_else(|| Error::NotFound(format!("platform {platform}")))?;
        client.authenticate().await?;
        client.get_post_metrics(post_id).await
    }
}
