//! Detection of inorganic engagement.

use super::EngagementMetrics;
use tracing::debug;

/// Flags posts whose likes are implausibly high relative to views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamingDetector {
    like_view_ratio_threshold: f64,
}

impl GamingDetector {
    /// Create a detector flagging `likes / views > like_view_ratio_threshold`.
    #[must_use]
    pub fn new(like_view_ratio_threshold: f64) -> Self {
        Self {
            like_view_ratio_threshold,
        }
    }

    /// Configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.like_view_ratio_threshold
    }

    /// Whether the metrics look artificially inflated.
    ///
    /// Posts without views are undecidable and never flagged.
    #[must_use]
    pub fn detect(&self, metrics: &EngagementMetrics) -> bool {
        if metrics.views == 0.0 {
            return false;
        }
        let ratio = metrics.likes / metrics.views;
        let flagged = ratio > self.like_view_ratio_threshold;
        if flagged {
            debug!(
                "Like/view ratio {:.3} exceeds {:.3}",
                ratio, self.like_view_ratio_threshold
            );
        }
        flagged
    }
}

impl Default for GamingDetector {
    fn default() -> Self {
        Self::new(10.0)
    }
}
