//! Social platform clients.
//!
//! Platforms are resolved by name through an explicit [`PlatformRegistry`]
//! handed to every component that needs one. Each resolved client exposes
//! the same four operations regardless of the platform behind it.
//!
//! # Throttling
//!
//! The HTTP clients pace themselves: every outbound call waits on a per-platform
//! limiter before it is sent. This is independent of the non-blocking
//! [`RateLimiter`](crate::rate_limiter::RateLimiter) the coordinator consults
//! before it decides to touch a platform at all.

mod http;
mod instagram;
mod registry;
mod tiktok;
mod youtube;

pub use instagram::InstagramClient;
pub use registry::{PlatformFactory, PlatformRegistry};
pub use tiktok::TikTokClient;
pub use youtube::YouTubeClient;

use crate::error::Result;
use async_trait::async_trait;

/// Raw engagement counters as returned by a platform.
///
/// Values are passed through untouched (some platforms encode counts as
/// strings); [`normalize`](crate::engagement::normalize) coerces them.
pub type RawMetrics = serde_json::Map<String, serde_json::Value>;

/// Operations every platform client supports.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Platform name this client talks to.
    fn platform(&self) -> &str;

    /// Establish credentials for subsequent calls.
    async fn authenticate(&self) -> Result<()>;

    /// Raw `views`/`likes`/`comments`/`shares` counters for a post.
    async fn get_post_metrics(&self, post_id: &str) -> Result<RawMetrics>;

    /// Published text of a post.
    async fn get_post_text(&self, post_id: &str) -> Result<String>;

    /// Publication time of a post in epoch seconds.
    async fn get_post_time(&self, post_id: &str) -> Result<f64>;
}
