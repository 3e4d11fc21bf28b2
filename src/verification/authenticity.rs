//! Tag plus time-window verification of a published post.

use super::TemporalVerifier;
use crate::attribution::AttributionTagManager;
use crate::error::{Error, Result};
use crate::platform::PlatformRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of both authenticity checks for a fetched post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationReport {
    /// Post text is a live attribution tag.
    pub tag_valid: bool,
    /// Post time is within the allowed drift.
    pub within_drift: bool,
}

impl VerificationReport {
    /// Both checks passed.
    #[must_use]
    pub fn is_authentic(&self) -> bool {
        self.tag_valid && self.within_drift
    }
}

/// Verifies that a platform post carries a live tag and was published on time.
pub struct ContentAuthenticityVerifier {
    tags: Arc<AttributionTagManager>,
    temporal: TemporalVerifier,
    registry: Arc<PlatformRegistry>,
}

impl ContentAuthenticityVerifier {
    /// Create a verifier over shared tag state and platform registry.
    #[must_use]
    pub fn new(
        tags: Arc<AttributionTagManager>,
        temporal: TemporalVerifier,
        registry: Arc<PlatformRegistry>,
    ) -> Self {
        Self {
            tags,
            temporal,
            registry,
        }
    }

    /// Whether a post is authentic.
    ///
    /// Fail-closed: an unknown platform or any authentication or fetch
    /// error yields `false`.
    pub async fn verify(&self, post_id: &str, platform: &str, reference_time: f64) -> bool {
        match self.verify_detailed(post_id, platform, reference_time).await {
            Ok(report) => {
                debug!(
                    "Post {} on {}: tag_valid={}, within_drift={}",
                    post_id, platform, report.tag_valid, report.within_drift
                );
                report.is_authentic()
            }
            Err(e) => {
                warn!(
                    "Verification of {} on {} failed closed: {}",
                    post_id, platform, e
                );
                false
            }
        }
    }

    /// Run both checks and report each outcome.
    ///
    /// Both the text and the publication time are fetched even when the tag
    /// check already failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown platform, or the client's
    /// error if authentication or either fetch fails.
    pub async fn verify_detailed(
        &self,
        post_id: &str,
        platform: &str,
        reference_time: f64,
    ) -> Result<VerificationReport> {
        let client = self
            .registry
            .resolve(platform)
            .ok_or_else(|| Error::NotFound(format!("platform {platform}")))?;
        client.authenticate().await?;

        let text = client.get_post_text(post_id).await?;
        let tag_valid = self.tags.validate_tag(&text);

        let post_time = client.get_post_time(post_id).await?;
        let within_drift = self.temporal.verify(post_time, reference_time);

        Ok(VerificationReport {
            tag_valid,
            within_drift,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::platform::{PlatformClient, RawMetrics};
    use async_trait::async_trait;

    #[derive(Clone)]
    struct StaticPost {
        text: Option<String>,
        time: Option<f64>,
        auth_ok: bool,
    }

    #[async_trait]
    impl PlatformClient for StaticPost {
        fn platform(&self) -> &str {
            "static"
        }

        async fn authenticate(&self) -> Result<()> {
            if self.auth_ok {
                Ok(())
            } else {
                Err(Error::Config("no credentials".to_string()))
            }
        }

        async fn get_post_metrics(&self, _post_id: &str) -> Result<RawMetrics> {
            Ok(RawMetrics::new())
        }

        async fn get_post_text(&self, _post_id: &str) -> Result<String> {
            self.text
                .clone()
                .ok_or_else(|| Error::Network("timed out".to_string()))
        }

        async fn get_post_time(&self, _post_id: &str) -> Result<f64> {
            self.time
                .ok_or_else(|| Error::Network("timed out".to_string()))
        }
    }

    fn verifier_for(post: StaticPost, tags: Arc<AttributionTagManager>) -> ContentAuthenticityVerifier {
        let mut registry = PlatformRegistry::new();
        registry.register("static", move || Box::new(post.clone()));
        ContentAuthenticityVerifier::new(tags, TemporalVerifier::new(600.0), Arc::new(registry))
    }

    #[tokio::test]
    async fn test_tagged_post_on_time_is_authentic() {
        let tags = Arc::new(AttributionTagManager::new());
        let tag = tags.create_attribution_tag("s1", "m1", 0.0);
        let verifier = verifier_for(
            StaticPost {
                text: Some(tag),
                time: Some(100.0),
                auth_ok: true,
            },
            tags,
        );

        assert!(verifier.verify("p1", "static", 0.0).await);
    }

    #[tokio::test]
    async fn test_both_checks_reported() {
        let tags = Arc::new(AttributionTagManager::new());
        let verifier = verifier_for(
            StaticPost {
                text: Some("no tag here".to_string()),
                time: Some(5_000.0),
                auth_ok: true,
            },
            tags,
        );

        let report = verifier
            .verify_detailed("p1", "static", 0.0)
            .await
            .expect("report");
        assert_eq!(
            report,
            VerificationReport {
                tag_valid: false,
                within_drift: false,
            }
        );
        assert!(!verifier.verify("p1", "static", 0.0).await);
    }

    #[tokio::test]
    async fn test_late_post_is_rejected() {
        let tags = Arc::new(AttributionTagManager::new());
        let tag = tags.create_attribution_tag("s1", "m1", 0.0);
        let verifier = verifier_for(
            StaticPost {
                text: Some(tag),
                time: Some(601.0),
                auth_ok: true,
            },
            tags,
        );

        let report = verifier.verify_detailed("p1", "static", 0.0).await.expect("report");
        assert!(report.tag_valid);
        assert!(!report.within_drift);
        assert!(!verifier.verify("p1", "static", 0.0).await);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_closed() {
        let tags = Arc::new(AttributionTagManager::new());
        let tag = tags.create_attribution_tag("s1", "m1", 0.0);
        let verifier = verifier_for(
            StaticPost {
                text: Some(tag),
                time: None,
                auth_ok: true,
            },
            tags,
        );

        assert!(!verifier.verify("p1", "static", 0.0).await);
        assert!(matches!(
            verifier.verify_detailed("p1", "static", 0.0).await,
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_fails_closed() {
        let tags = Arc::new(AttributionTagManager::new());
        let tag = tags.create_attribution_tag("s1", "m1", 0.0);
        let verifier = verifier_for(
            StaticPost {
                text: Some(tag),
                time: Some(0.0),
                auth_ok: false,
            },
            tags,
        );

        assert!(!verifier.verify("p1", "static", 0.0).await);
    }

    #[tokio::test]
    async fn test_unknown_platform_fails_closed() {
        let tags = Arc::new(AttributionTagManager::new());
        let verifier = verifier_for(
            StaticPost {
                text: None,
                time: None,
                auth_ok: true,
            },
            tags,
        );

        assert!(!verifier.verify("p1", "myspace", 0.0).await);
        assert!(matches!(
            verifier.verify_detailed("p1", "myspace", 0.0).await,
            Err(Error::NotFound(_))
        ));
    }
}
