//! Common engagement schema and the checks run against it.

use crate::config::ViralityConfig;
use crate::platform::RawMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Counters every platform is normalised to.
pub const METRIC_FIELDS: [&str; 4] = ["views", "likes", "comments", "shares"];

/// Normalised engagement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// View count.
    pub views: f64,
    /// Like count.
    pub likes: f64,
    /// Comment count.
    pub comments: f64,
    /// Share count.
    pub shares: f64,
}

impl EngagementMetrics {
    /// Likes + comments + shares.
    #[must_use]
    pub fn total_engagement(&self) -> f64 {
        self.likes + self.comments + self.shares
    }

    /// Engagement per view, or 0 when there are no views.
    #[must_use]
    pub fn engagement_rate(&self) -> f64 {
        if self.views == 0.0 {
            0.0
        } else {
            self.total_engagement() / self.views
        }
    }
}

/// Coerce raw platform counters into [`EngagementMetrics`].
///
/// Each field is coerced on its own: numbers and numeric strings are used
/// as-is, booleans count as 1 or 0, and anything else (missing, null,
/// unparseable, non-finite) becomes 0.0 without affecting other fields.
#[must_use]
pub fn normalize(raw: &RawMetrics) -> EngagementMetrics {
    let field = |name: &str| raw.get(name).map_or(0.0, coerce);
    EngagementMetrics {
        views: field("views"),
        likes: field("likes"),
        comments: field("comments"),
        shares: field("shares"),
    }
}

fn coerce(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Thresholds for [`is_viral_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViralityThresholds {
    /// Minimum views.
    pub view_threshold: f64,
    /// Minimum engagement rate.
    pub engagement_rate_threshold: f64,
}

impl Default for ViralityThresholds {
    fn default() -> Self {
        Self {
            view_threshold: 100_000.0,
            engagement_rate_threshold: 0.1,
        }
    }
}

impl From<&ViralityConfig> for ViralityThresholds {
    fn from(config: &ViralityConfig) -> Self {
        Self {
            view_threshold: config.view_threshold,
            engagement_rate_threshold: config.engagement_rate_threshold,
        }
    }
}

/// Viral check with the default thresholds (100 000 views, rate 0.1).
#[must_use]
pub fn is_viral(metrics: &EngagementMetrics) -> bool {
    is_viral_with(metrics, &ViralityThresholds::default())
}

/// A post is viral when it reaches the view threshold and its engagement
/// rate is at least the rate threshold.
#[must_use]
pub fn is_viral_with(metrics: &EngagementMetrics, thresholds: &ViralityThresholds) -> bool {
    if metrics.views < thresholds.view_threshold {
        return false;
    }
    metrics.engagement_rate() >= thresholds.engagement_rate_threshold
}
