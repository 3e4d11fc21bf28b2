//! Coordinator event system.

use tokio::sync::broadcast;

/// Events emitted by the integration coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// An attribution tag was issued for a submission.
    TagCreated {
        /// Submission identifier.
        submission_id: String,
    },

    /// A post finished authenticity verification.
    PostVerified {
        /// Platform post identifier.
        post_id: String,
        /// Platform name.
        platform: String,
        /// Verification verdict.
        valid: bool,
    },

    /// Engagement metrics were collected and persisted.
    MetricsCollected {
        /// Platform post identifier.
        post_id: String,
        /// Platform name.
        platform: String,
    },

    /// Engagement looks inorganic.
    GamingSuspected {
        /// Platform post identifier.
        post_id: String,
    },

    /// A platform call was refused by the rate limiter.
    RateLimited {
        /// Platform name (rate-limit key).
        platform: String,
    },

    /// An artifact was written to local storage.
    ArtifactStored {
        /// Artifact name.
        name: String,
    },

    /// Tracked artifacts whose backing files disappeared.
    ArtifactsCorrupted {
        /// Names purged from metadata.
        names: Vec<String>,
    },
}

/// Channel for receiving coordinator events.
pub type CoordinatorEventsChannel = broadcast::Receiver<CoordinatorEvent>;

/// Sender for coordinator events.
pub type CoordinatorEventsSender = broadcast::Sender<CoordinatorEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (CoordinatorEventsSender, CoordinatorEventsChannel) {
    broadcast::channel(256)
}
