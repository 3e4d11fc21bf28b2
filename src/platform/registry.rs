//! Name-to-constructor registry for platform clients.

use super::{InstagramClient, PlatformClient, TikTokClient, YouTubeClient};
use super::http::PacedHttp;
use crate::config::PlatformConfig;
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Constructor for a platform client.
pub type PlatformFactory = Arc<dyn Fn() -> Box<dyn PlatformClient> + Send + Sync>;

/// Registry mapping platform names to client constructors.
///
/// Built once at startup and shared by reference. Tests register stub
/// clients on their own registry instead of mutating global state.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    factories: HashMap<String, PlatformFactory>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the YouTube, TikTok and Instagram clients.
    ///
    /// Clients of the same platform share one HTTP connection pool and one
    /// pacing limiter, so pacing holds across resolved instances.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_defaults(config: &PlatformConfig) -> Result<Self> {
        let mut registry = Self::new();

        let http = PacedHttp::new(config)?;
        let api_key = config.youtube_api_key.clone();
        registry.register("youtube", move || {
            Box::new(YouTubeClient::new(http.clone(), api_key.clone()))
        });

        let http = PacedHttp::new(config)?;
        let token = config.tiktok_access_token.clone();
        registry.register("tiktok", move || {
            Box::new(TikTokClient::new(http.clone(), token.clone()))
        });

        let http = PacedHttp::new(config)?;
        let token = config.instagram_access_token.clone();
        registry.register("instagram", move || {
            Box::new(InstagramClient::new(http.clone(), token.clone()))
        });

        info!(
            "Platform registry initialized with {} platforms",
            registry.factories.len()
        );
        Ok(registry)
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn PlatformClient> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering platform {}", name);
        self.factories.insert(name, Arc::new(factory));
    }

    /// Construct a client for `name`, or `None` for an unknown platform.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Box<dyn PlatformClient>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered platform names, sorted.
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}
