//! Engagement metrics: collection, normalisation, virality and gaming checks.

mod collector;
mod gaming;
mod metrics;

pub use collector::EngagementMetricsCollector;
pub use gaming::GamingDetector;
pub use metrics::{
    is_viral, is_viral_with, normalize, EngagementMetrics, ViralityThresholds, METRIC_FIELDS,
};
