//! Time-window check.

/// Accepts event times within `allowed_drift` seconds of a reference time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalVerifier {
    allowed_drift: f64,
}

impl TemporalVerifier {
    /// Create a verifier allowing `allowed_drift` seconds either way.
    #[must_use]
    pub fn new(allowed_drift: f64) -> Self {
        Self { allowed_drift }
    }

    /// Allowed drift in seconds.
    #[must_use]
    pub fn allowed_drift(&self) -> f64 {
        self.allowed_drift
    }

    /// `true` iff `|post_time - reference_time| <= allowed_drift`.
    #[must_use]
    pub fn verify(&self, post_time: f64, reference_time: f64) -> bool {
        (post_time - reference_time).abs() <= self.allowed_drift
    }
}

impl Default for TemporalVerifier {
    fn default() -> Self {
        Self::new(600.0)
    }
}
