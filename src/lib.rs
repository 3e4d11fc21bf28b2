//! # tensorflix-core
//!
//! Trust and resource core for the TensorFlix crowdsourced content-validation
//! network.
//!
//! The crate proves that a social-media post is attributable to a specific
//! miner submission within a bounded time window, protects platform API
//! budgets, and manages bounded local storage for submitted media artifacts.
//!
//! ## Components
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │  IntegrationCoordinator  │
//!                 └────────────┬─────────────┘
//!        ┌──────────┬──────────┼───────────┬──────────────┐
//!        ▼          ▼          ▼           ▼              ▼
//!  RateLimiter  Attribution  Content    Engagement    StorageManager
//!               TagManager   Verifier   Collector          │
//!                    ▲          │           │              ▼
//!                    └──────────┤           │        artifact files
//!                               ▼           ▼
//!                          PlatformRegistry (YouTube, TikTok, Instagram)
//! ```
//!
//! Verification is fail-closed: any fetch error rejects the post. Metric
//! collection is fail-soft: any fetch error yields empty metrics.

pub mod attribution;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod engagement;
pub mod error;
pub mod event;
pub mod platform;
pub mod rate_limiter;
pub mod storage;
pub mod verification;

pub use attribution::{AttributionTag, AttributionTagManager, TAG_TTL_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use coordinator::{
    CoordinatorBuilder, IntegrationCoordinator, MaintenanceReport, PostOutcome,
};
pub use database::{Database, SubmissionStatus, SubmissionStore};
pub use engagement::{
    is_viral, is_viral_with, normalize, EngagementMetrics, EngagementMetricsCollector,
    GamingDetector, ViralityThresholds,
};
pub use error::{Error, Result};
pub use event::{CoordinatorEvent, CoordinatorEventsChannel};
pub use platform::{PlatformClient, PlatformRegistry, RawMetrics};
pub use rate_limiter::RateLimiter;
pub use storage::{StorageManager, StorageStats};
pub use verification::{ContentAuthenticityVerifier, TemporalVerifier, VerificationReport};
