//! End-to-end processing of one submission.
//!
//! The coordinator wires the tag manager, verifier, metrics collector,
//! gaming detector, rate limiter, artifact storage and a [`SubmissionStore`]
//! together. None of those components know about the coordinator.

use crate::attribution::AttributionTagManager;
use crate::clock::{self, Clock};
use crate::config::CoreConfig;
use crate::database::{
    Database, EngagementSnapshot, SocialPostRecord, SubmissionStatus, SubmissionStore,
    ValidationRecord,
};
use crate::engagement::{
    is_viral_with, normalize, EngagementMetrics, EngagementMetricsCollector, GamingDetector,
    ViralityThresholds,
};
use crate::error::{Error, Result};
use crate::event::{
    create_event_channel, CoordinatorEvent, CoordinatorEventsChannel, CoordinatorEventsSender,
};
use crate::platform::PlatformRegistry;
use crate::rate_limiter::RateLimiter;
use crate::storage::StorageManager;
use crate::verification::{ContentAuthenticityVerifier, TemporalVerifier};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Builder for [`IntegrationCoordinator`].
///
/// Unset collaborators are created from the configuration: the default
/// platform clients, a SQLite database at [`CoreConfig::database_path`] and
/// the system clock.
pub struct CoordinatorBuilder {
    config: CoreConfig,
    registry: Option<PlatformRegistry>,
    store: Option<Arc<dyn SubmissionStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoordinatorBuilder {
    /// Create a new coordinator builder with the given configuration.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            registry: None,
            store: None,
            clock: None,
        }
    }

    /// Resolve platforms from `registry` instead of the default clients.
    #[must_use]
    pub fn registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Persist through `store` instead of opening the configured database.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SubmissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Read time from `clock` in every component.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root or database cannot be opened, or
    /// the default platform clients cannot be built.
    pub fn build(self) -> Result<IntegrationCoordinator> {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(clock::system);

        let registry = match self.registry {
            Some(registry) => registry,
            None => PlatformRegistry::with_defaults(&config.platforms)?,
        };
        let registry = Arc::new(registry);

        let store = match self.store {
            Some(store) => store,
            None => {
                let db = Database::open(&config.database_path(), config.database.pool_size)?
                    .with_clock(Arc::clone(&clock));
                Arc::new(db)
            }
        };

        let tags = Arc::new(AttributionTagManager::with_clock(Arc::clone(&clock)));
        let verifier = ContentAuthenticityVerifier::new(
            Arc::clone(&tags),
            TemporalVerifier::new(config.verification.allowed_drift_secs),
            Arc::clone(&registry),
        );
        let limiter = RateLimiter::with_clock(
            config.rate_limit.requests,
            config.rate_limit.period(),
            Arc::clone(&clock),
        );
        let storage = StorageManager::with_clock(
            config.storage.root_dir.clone(),
            config.storage.max_size_bytes,
            Arc::clone(&clock),
        )?;

        let (events_tx, _) = create_event_channel();

        info!(
            "Coordinator ready with platforms {:?}",
            registry.platforms()
        );

        Ok(IntegrationCoordinator {
            tags,
            verifier,
            collector: EngagementMetricsCollector::new(Arc::clone(&registry)),
            gaming: GamingDetector::new(config.gaming.like_view_ratio_threshold),
            virality: ViralityThresholds::from(&config.virality),
            registry,
            limiter,
            call_cost: config.rate_limit.call_cost,
            storage,
            store,
            clock,
            events_tx,
        })
    }
}

/// Result of processing one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostOutcome {
    /// Post carried a live tag and was published within the drift window.
    pub valid: bool,
    /// Normalized engagement metrics (all zero if collection failed).
    pub metrics: EngagementMetrics,
    /// Likes-per-view ratio exceeded the gaming threshold.
    pub gaming_suspected: bool,
    /// Post met the virality thresholds.
    pub viral: bool,
    /// Status recorded for the submission.
    pub status: SubmissionStatus,
}

/// What a maintenance pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Artifacts deleted for not being accessed within the age limit.
    pub removed: Vec<String>,
    /// Artifacts whose files had disappeared, purged from metadata.
    pub corrupted: Vec<String>,
    /// Expired attribution tags dropped.
    pub expired_tags: usize,
}

/// Processes submissions end to end.
pub struct IntegrationCoordinator {
    tags: Arc<AttributionTagManager>,
    verifier: ContentAuthenticityVerifier,
    collector: EngagementMetricsCollector,
    gaming: GamingDetector,
    virality: ViralityThresholds,
    registry: Arc<PlatformRegistry>,
    limiter: RateLimiter,
    call_cost: f64,
    storage: StorageManager,
    store: Arc<dyn SubmissionStore>,
    clock: Arc<dyn Clock>,
    events_tx: CoordinatorEventsSender,
}

impl IntegrationCoordinator {
    /// Issue an attribution tag and record the submission as pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission cannot be persisted. The tag is
    /// issued either way.
    pub fn create_tag(
        &self,
        submission_id: &str,
        miner_id: &str,
        timestamp: f64,
    ) -> Result<String> {
        let tag = self
            .tags
            .create_attribution_tag(submission_id, miner_id, timestamp);
        self.store
            .upsert_submission_status(submission_id, SubmissionStatus::Pending)?;
        self.emit(CoordinatorEvent::TagCreated {
            submission_id: submission_id.to_string(),
        });
        Ok(tag)
    }

    /// Fail-closed authenticity check of a post.
    pub async fn verify_post(&self, post_id: &str, platform: &str, reference_time: f64) -> bool {
        self.verifier.verify(post_id, platform, reference_time).await
    }

    /// Fail-soft, normalized engagement metrics of a post.
    pub async fn collect_metrics(&self, post_id: &str, platform: &str) -> EngagementMetrics {
        normalize(&self.collector.collect(post_id, platform).await)
    }

    /// Verify a post, collect its metrics and persist every result.
    ///
    /// A post is `rejected` if verification fails, `flagged` if its
    /// engagement looks gamed and `verified` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] without contacting the platform when
    /// the platform's budget is exhausted; a submission still `pending` is
    /// then marked `deferred`, any later status is left alone. Unknown
    /// platforms never consume budget. Persistence failures are returned
    /// as well.
    pub async fn process_post(
        &self,
        submission_id: &str,
        post_id: &str,
        platform: &str,
        reference_time: f64,
    ) -> Result<PostOutcome> {
        if self.registry.contains(platform) && !self.limiter.check(platform, self.call_cost) {
            warn!(
                "Deferring submission {}: {} budget exhausted",
                submission_id, platform
            );
            match self.store.submission_status(submission_id)? {
                None | Some(SubmissionStatus::Pending) => self
                    .store
                    .upsert_submission_status(submission_id, SubmissionStatus::Deferred)?,
                Some(status) => debug!(
                    "Keeping submission {} as {:?} despite exhausted budget",
                    submission_id, status
                ),
            }
            self.emit(CoordinatorEvent::RateLimited {
                platform: platform.to_string(),
            });
            return Err(Error::RateLimited(platform.to_string()));
        }

        let valid = self.verify_post(post_id, platform, reference_time).await;
        self.store.upsert_social_post(&SocialPostRecord {
            submission_id: submission_id.to_string(),
            post_id: post_id.to_string(),
            platform: platform.to_string(),
            valid,
            checked_at: self.clock.now(),
        })?;
        self.emit(CoordinatorEvent::PostVerified {
            post_id: post_id.to_string(),
            platform: platform.to_string(),
            valid,
        });

        let metrics = self.collect_metrics(post_id, platform).await;
        self.store
            .insert_engagement_snapshot(&EngagementSnapshot::from_metrics(
                post_id,
                platform,
                &metrics,
                self.clock.now(),
            ))?;
        self.emit(CoordinatorEvent::MetricsCollected {
            post_id: post_id.to_string(),
            platform: platform.to_string(),
        });

        let gaming_suspected = self.gaming.detect(&metrics);
        let viral = is_viral_with(&metrics, &self.virality);
        if gaming_suspected {
            self.emit(CoordinatorEvent::GamingSuspected {
                post_id: post_id.to_string(),
            });
        }

        self.record_verdict(submission_id, "authenticity", valid, "pass", "fail")?;
        self.record_verdict(
            submission_id,
            "gaming",
            gaming_suspected,
            "suspected",
            "clear",
        )?;

        let status = if !valid {
            SubmissionStatus::Rejected
        } else if gaming_suspected {
            SubmissionStatus::Flagged
        } else {
            SubmissionStatus::Verified
        };
        self.store.upsert_submission_status(submission_id, status)?;

        debug!(
            "Processed {} on {} for {}: {}",
            post_id, platform, submission_id, status
        );

        Ok(PostOutcome {
            valid,
            metrics,
            gaming_suspected,
            viral,
            status,
        })
    }

    fn record_verdict(
        &self,
        submission_id: &str,
        validation_type: &str,
        outcome: bool,
        when_true: &str,
        when_false: &str,
    ) -> Result<()> {
        self.store.insert_validation_result(&ValidationRecord {
            submission_id: submission_id.to_string(),
            validation_type: validation_type.to_string(),
            result: if outcome { when_true } else { when_false }.to_string(),
            score: if outcome { 1.0 } else { 0.0 },
            timestamp: self.clock.now(),
        })
    }

    /// Copy an artifact into bounded storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn store_artifact(&self, source: &Path, name: Option<&str>) -> Result<PathBuf> {
        let path = self.storage.store_file(source, name)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.emit(CoordinatorEvent::ArtifactStored { name });
        Ok(path)
    }

    /// Path of a stored artifact, marking it recently used.
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<PathBuf> {
        self.storage.get_file(name)
    }

    /// Drop stale artifacts, purge artifacts whose files vanished and
    /// forget expired tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the stale-artifact sweep fails.
    pub fn run_maintenance(&self, max_age: Duration) -> Result<MaintenanceReport> {
        let removed = self.storage.cleanup_old_files(max_age)?;
        let corrupted: Vec<String> = self
            .storage
            .detect_corruption()
            .into_iter()
            .filter_map(|(name, healthy)| (!healthy).then_some(name))
            .collect();
        let expired_tags = self.tags.purge_expired();

        if !corrupted.is_empty() {
            self.emit(CoordinatorEvent::ArtifactsCorrupted {
                names: corrupted.clone(),
            });
        }
        info!(
            "Maintenance removed {} stale and {} missing artifacts, {} expired tags",
            removed.len(),
            corrupted.len(),
            expired_tags
        );

        Ok(MaintenanceReport {
            removed,
            corrupted,
            expired_tags,
        })
    }

    /// Accumulated API cost charged against `platform`.
    #[must_use]
    pub fn api_cost(&self, platform: &str) -> f64 {
        self.limiter.get_cost(platform)
    }

    /// Subscribe to coordinator events.
    #[must_use]
    pub fn subscribe_events(&self) -> CoordinatorEventsChannel {
        self.events_tx.subscribe()
    }

    /// Shared attribution tag state.
    #[must_use]
    pub fn tags(&self) -> &Arc<AttributionTagManager> {
        &self.tags
    }

    /// Artifact storage.
    #[must_use]
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::platform::{PlatformClient, RawMetrics};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    const NOW: f64 = 1_700_000_000.0;

    #[derive(Clone)]
    struct FakePost {
        text: Arc<Mutex<String>>,
        time: f64,
        metrics: RawMetrics,
    }

    #[async_trait]
    impl PlatformClient for FakePost {
        fn platform(&self) -> &str {
            "fake"
        }

        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn get_post_metrics(&self, _post_id: &str) -> Result<RawMetrics> {
            Ok(self.metrics.clone())
        }

        async fn get_post_text(&self, _post_id: &str) -> Result<String> {
            Ok(self.text.lock().clone())
        }

        async fn get_post_time(&self, _post_id: &str) -> Result<f64> {
            Ok(self.time)
        }
    }

    struct Harness {
        coordinator: IntegrationCoordinator,
        db: Arc<Database>,
        text: Arc<Mutex<String>>,
        dir: tempfile::TempDir,
    }

    fn harness(metrics: serde_json::Value, requests: u32) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
        let text = Arc::new(Mutex::new(String::new()));

        let post = FakePost {
            text: Arc::clone(&text),
            time: NOW + 60.0,
            metrics: metrics.as_object().cloned().unwrap_or_default(),
        };
        let mut registry = PlatformRegistry::new();
        registry.register("fake", move || Box::new(post.clone()));

        let db = Arc::new(
            Database::open_in_memory(1)
                .expect("db")
                .with_clock(Arc::clone(&clock)),
        );

        let mut config = CoreConfig::default();
        config.storage.root_dir = dir.path().join("storage");
        config.rate_limit.requests = requests;
        config.rate_limit.call_cost = 0.25;

        let coordinator = CoordinatorBuilder::new(config)
            .registry(registry)
            .store(Arc::clone(&db) as Arc<dyn SubmissionStore>)
            .clock(clock)
            .build()
            .expect("build");

        Harness {
            coordinator,
            db,
            text,
            dir,
        }
    }

    #[tokio::test]
    async fn test_authentic_post_is_verified() {
        let h = harness(json!({"views": 1000, "likes": "50", "comments": 5}), 10);
        let tag = h.coordinator.create_tag("s1", "m1", NOW).expect("tag");
        *h.text.lock() = tag;

        let outcome = h
            .coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .expect("process");

        assert!(outcome.valid);
        assert!(!outcome.gaming_suspected);
        assert!(!outcome.viral);
        assert_eq!(outcome.status, SubmissionStatus::Verified);
        assert!((outcome.metrics.likes - 50.0).abs() < f64::EPSILON);

        assert_eq!(h.db.social_post_validity("p1", "fake").expect("query"), Some(true));
        let snapshot = h.db.latest_snapshot("p1", "fake").expect("query").expect("row");
        assert_eq!(snapshot.views, 1000);
        let record = h.db.submission("s1").expect("query").expect("row");
        assert_eq!(record.status, SubmissionStatus::Verified);
        assert_eq!(h.db.validation_results("s1").expect("query").len(), 2);
    }

    #[tokio::test]
    async fn test_untagged_post_is_rejected() {
        let h = harness(json!({"views": 10}), 10);
        h.coordinator.create_tag("s1", "m1", NOW).expect("tag");
        *h.text.lock() = "just a video".to_string();

        let outcome = h
            .coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .expect("process");

        assert!(!outcome.valid);
        assert_eq!(outcome.status, SubmissionStatus::Rejected);
        assert_eq!(h.db.social_post_validity("p1", "fake").expect("query"), Some(false));
    }

    #[tokio::test]
    async fn test_gamed_post_is_flagged() {
        let h = harness(json!({"views": 10, "likes": 500}), 10);
        let tag = h.coordinator.create_tag("s1", "m1", NOW).expect("tag");
        *h.text.lock() = tag;
        let mut events = h.coordinator.subscribe_events();

        let outcome = h
            .coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .expect("process");

        assert!(outcome.valid);
        assert!(outcome.gaming_suspected);
        assert_eq!(outcome.status, SubmissionStatus::Flagged);

        let mut saw_gaming = false;
        while let Ok(event) = events.try_recv() {
            if event == (CoordinatorEvent::GamingSuspected { post_id: "p1".to_string() }) {
                saw_gaming = true;
            }
        }
        assert!(saw_gaming);
    }

    #[tokio::test]
    async fn test_rate_limited_post_is_deferred() {
        let h = harness(json!({"views": 10}), 1);
        h.coordinator.create_tag("s1", "m1", NOW).expect("tag");
        h.coordinator.create_tag("s2", "m2", NOW).expect("tag");

        h.coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .expect("first call allowed");
        let err = h
            .coordinator
            .process_post("s2", "p2", "fake", NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited(_)));
        let record = h.db.submission("s2").expect("query").expect("row");
        assert_eq!(record.status, SubmissionStatus::Deferred);
        assert_eq!(h.db.social_post_validity("p2", "fake").expect("query"), None);
        assert!((h.coordinator.api_cost("fake") - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_budget_denial_keeps_settled_status() {
        let h = harness(json!({"views": 10}), 1);
        h.coordinator.create_tag("s1", "m1", NOW).expect("tag");

        let first = h
            .coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .expect("first call allowed");
        let settled = first.status;
        assert_ne!(settled, SubmissionStatus::Pending);

        let err = h
            .coordinator
            .process_post("s1", "p1", "fake", NOW)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited(_)));
        let record = h.db.submission("s1").expect("query").expect("row");
        assert_eq!(record.status, settled);
    }

    #[tokio::test]
    async fn test_unknown_platform_fails_closed_and_soft() {
        let h = harness(json!({}), 10);
        h.coordinator.create_tag("s1", "m1", NOW).expect("tag");

        let outcome = h
            .coordinator
            .process_post("s1", "p1", "myspace", NOW)
            .await
            .expect("process");

        assert!(!outcome.valid);
        assert_eq!(outcome.metrics, EngagementMetrics::default());
        assert_eq!(outcome.status, SubmissionStatus::Rejected);
        assert!(h.coordinator.api_cost("myspace").abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unknown_platform_does_not_exhaust_budget() {
        let h = harness(json!({}), 1);
        h.coordinator.create_tag("s1", "m1", NOW).expect("tag");

        for post in ["p1", "p2", "p3"] {
            let outcome = h
                .coordinator
                .process_post("s1", post, "myspace", NOW)
                .await
                .expect("unknown platform is never rate limited");
            assert_eq!(outcome.status, SubmissionStatus::Rejected);
        }
        assert!(h.coordinator.api_cost("myspace").abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_create_tag_records_pending() {
        let h = harness(json!({}), 10);
        let mut events = h.coordinator.subscribe_events();
        let tag = h.coordinator.create_tag("s1", "m1", NOW).expect("tag");

        assert!(h.coordinator.tags().validate_tag(&tag));
        assert_eq!(h.db.pending_submissions().expect("query").len(), 1);
        assert_eq!(
            events.try_recv().expect("event"),
            CoordinatorEvent::TagCreated {
                submission_id: "s1".to_string()
            }
        );
    }

    #[test]
    fn test_artifact_store_and_maintenance() {
        let h = harness(json!({}), 10);
        let src = h.dir.path().join("clip.mp4");
        std::fs::write(&src, b"frames").expect("write");

        let stored = h.coordinator.store_artifact(&src, None).expect("store");
        assert_eq!(h.coordinator.artifact("clip.mp4"), Some(stored.clone()));

        std::fs::remove_file(&stored).expect("remove");
        let report = h
            .coordinator
            .run_maintenance(Duration::from_secs(3600))
            .expect("maintenance");
        assert_eq!(report.corrupted, vec!["clip.mp4".to_string()]);
        assert!(report.removed.is_empty());
        assert!(h.coordinator.artifact("clip.mp4").is_none());
    }
}
