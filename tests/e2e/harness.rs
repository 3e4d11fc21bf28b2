//! Test harness wiring a coordinator to stub platform clients.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tensorflix_core::{
    Clock, CoordinatorBuilder, CoreConfig, Database, Error, IntegrationCoordinator,
    ManualClock, PlatformClient, PlatformRegistry, RawMetrics, Result, SubmissionStore,
};

/// Simulated start time (2023-11-14T22:13:20Z).
pub const START: f64 = 1_700_000_000.0;

/// A post as the stub platform serves it.
#[derive(Debug, Clone)]
pub struct StubPost {
    /// Post text.
    pub text: String,
    /// Publication time.
    pub time: f64,
    /// Raw metric payload.
    pub metrics: Value,
}

type Posts = Arc<Mutex<HashMap<String, StubPost>>>;

/// Serves posts from a shared map; unknown ids are `NotFound`.
#[derive(Clone)]
struct StubPlatform {
    name: &'static str,
    posts: Posts,
}

impl StubPlatform {
    fn post(&self, post_id: &str) -> Result<StubPost> {
        self.posts
            .lock()
            .get(post_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} post {post_id}", self.name)))
    }
}

#[async_trait]
impl PlatformClient for StubPlatform {
    fn platform(&self) -> &str {
        self.name
    }

    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    async fn get_post_metrics(&self, post_id: &str) -> Result<RawMetrics> {
        Ok(self.post(post_id)?.metrics.as_object().cloned().unwrap_or_default())
    }

    async fn get_post_text(&self, post_id: &str) -> Result<String> {
        Ok(self.post(post_id)?.text)
    }

    async fn get_post_time(&self, post_id: &str) -> Result<f64> {
        Ok(self.post(post_id)?.time)
    }
}

/// Platform whose every call times out.
#[derive(Clone)]
struct DownPlatform;

#[async_trait]
impl PlatformClient for DownPlatform {
    fn platform(&self) -> &str {
        "down"
    }

    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    async fn get_post_metrics(&self, _post_id: &str) -> Result<RawMetrics> {
        Err(Error::Network("timed out".to_string()))
    }

    async fn get_post_text(&self, _post_id: &str) -> Result<String> {
        Err(Error::Network("timed out".to_string()))
    }

    async fn get_post_time(&self, _post_id: &str) -> Result<f64> {
        Err(Error::Network("timed out".to_string()))
    }
}

/// A coordinator over stub platforms `"stub"` and `"down"`, an on-disk
/// database and artifact directory, and a manual clock.
pub struct TestHarness {
    /// Coordinator under test.
    pub coordinator: IntegrationCoordinator,
    /// Database the coordinator writes to.
    pub db: Arc<Database>,
    /// Simulated time shared by every component.
    pub clock: ManualClock,
    posts: Posts,
    dir: TempDir,
}

impl TestHarness {
    /// Harness with default configuration.
    pub fn setup() -> Self {
        Self::setup_with(|_| {})
    }

    /// Harness with configuration adjusted by `tweak`.
    ///
    /// Storage and database paths are always placed in a fresh temp dir.
    #[allow(clippy::expect_used)]
    pub fn setup_with(tweak: impl FnOnce(&mut CoreConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock = ManualClock::new(START);
        let posts = Posts::default();

        let mut config = CoreConfig::default();
        config.storage.root_dir = dir.path().join("artifacts");
        tweak(&mut config);

        let db = Arc::new(
            Database::open(&dir.path().join("tensorflix.db"), 2)
                .expect("database")
                .with_clock(Arc::new(clock.clone())),
        );

        let mut registry = PlatformRegistry::new();
        let stub = StubPlatform {
            name: "stub",
            posts: Arc::clone(&posts),
        };
        registry.register("stub", move || Box::new(stub.clone()));
        registry.register("down", || Box::new(DownPlatform));

        let coordinator = CoordinatorBuilder::new(config)
            .registry(registry)
            .store(Arc::clone(&db) as Arc<dyn SubmissionStore>)
            .clock(Arc::new(clock.clone()) as Arc<dyn Clock>)
            .build()
            .expect("coordinator");

        Self {
            coordinator,
            db,
            clock,
            posts,
            dir,
        }
    }

    /// Publish `post` under `post_id` on the stub platform.
    pub fn publish(&self, post_id: &str, post: StubPost) {
        self.posts.lock().insert(post_id.to_string(), post);
    }

    /// Write a file of `size` bytes into the scratch area and return its path.
    #[allow(clippy::expect_used)]
    pub fn scratch_file(&self, name: &str, size: usize) -> std::path::PathBuf {
        let scratch = self.dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).expect("scratch dir");
        let path = scratch.join(name);
        std::fs::write(&path, vec![0u8; size]).expect("write scratch file");
        path
    }
}
