//! Creation, lookup and validation of attribution tags.

use super::{TAG_PREFIX, TAG_TTL_SECS};
use crate::clock::{self, Clock};
use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::debug;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Built with Bittensor and TensorFlix - hash ([a-f0-9]{64})$")
        .expect("tag pattern is a valid regex")
});

/// A stored attribution tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionTag {
    /// Submission the tag was issued for.
    pub submission_id: String,
    /// Miner that produced the submission.
    pub miner_id: String,
    /// 64 lowercase hex characters.
    pub hash: String,
    /// Full tag text as published.
    pub text: String,
    /// Creation time in epoch seconds.
    pub created_at: f64,
}

impl AttributionTag {
    fn is_expired(&self, now: f64) -> bool {
        now - self.created_at >= TAG_TTL_SECS
    }
}

/// Issues and validates attribution tags.
///
/// Records are keyed by submission id. Expired records are purged lazily when
/// a lookup or validation touches them.
pub struct AttributionTagManager {
    tags: Mutex<HashMap<String, AttributionTag>>,
    clock: Arc<dyn Clock>,
}

impl AttributionTagManager {
    /// Create a manager using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(clock::system())
    }

    /// Create a manager reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tags: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Generate a hash that no live tag currently uses.
    ///
    /// The digest covers `miner_id`, `submission_timestamp` and a fresh random
    /// salt; a collision with a live hash triggers another draw.
    #[must_use]
    pub fn generate_unique_hash(&self, miner_id: &str, submission_timestamp: f64) -> String {
        let tags = self.tags.lock();
        Self::unique_hash(&tags, self.clock.now(), miner_id, submission_timestamp)
    }

    fn unique_hash(
        tags: &HashMap<String, AttributionTag>,
        now: f64,
        miner_id: &str,
        submission_timestamp: f64,
    ) -> String {
        loop {
            let salt: [u8; 16] = rand::random();
            let mut hasher = Sha256::new();
            hasher.update(miner_id.as_bytes());
            hasher.update(submission_timestamp.to_string().as_bytes());
            hasher.update(hex::encode(salt).as_bytes());
            let candidate = hex::encode(hasher.finalize());

            let taken = tags
                .values()
                .any(|tag| !tag.is_expired(now) && tag.hash == candidate);
            if !taken {
                return candidate;
            }
            debug!("Hash collision for miner {}, drawing a new salt", miner_id);
        }
    }

    /// Create and store a tag for `submission_id`, returning the tag text.
    ///
    /// Re-creating a tag for an existing submission replaces the old record.
    pub fn create_attribution_tag(
        &self,
        submission_id: &str,
        miner_id: &str,
        submission_timestamp: f64,
    ) -> String {
        let now = self.clock.now();
        let mut tags = self.tags.lock();
        let hash = Self::unique_hash(&tags, now, miner_id, submission_timestamp);
        let text = format!("{TAG_PREFIX}{hash}");

        debug!("Issued tag {} for submission {}", hash, submission_id);
        tags.insert(
            submission_id.to_string(),
            AttributionTag {
                submission_id: submission_id.to_string(),
                miner_id: miner_id.to_string(),
                hash,
                text: text.clone(),
                created_at: now,
            },
        );
        text
    }

    /// Tag text for a submission, or `None` if absent or expired.
    #[must_use]
    pub fn get_tag(&self, submission_id: &str) -> Option<String> {
        self.tag_record(submission_id).map(|tag| tag.text)
    }

    /// Full tag record for a submission, or `None` if absent or expired.
    ///
    /// An expired record is deleted as a side effect.
    #[must_use]
    pub fn tag_record(&self, submission_id: &str) -> Option<AttributionTag> {
        let now = self.clock.now();
        let mut tags = self.tags.lock();
        match tags.get(submission_id) {
            Some(tag) if tag.is_expired(now) => {
                debug!("Tag for submission {} expired", submission_id);
                tags.remove(submission_id);
                None
            }
            Some(tag) => Some(tag.clone()),
            None => None,
        }
    }

    /// Check whether `text` is a well-formed tag referring to a live hash.
    ///
    /// Surrounding whitespace is ignored and the match is case-insensitive.
    /// Expired records encountered during the scan are purged.
    #[must_use]
    pub fn validate_tag(&self, text: &str) -> bool {
        let Some(captures) = TAG_PATTERN.captures(text.trim()) else {
            debug!("Text does not match the attribution tag pattern");
            return false;
        };
        let Some(hash) = captures.get(1).map(|m| m.as_str().to_ascii_lowercase()) else {
            return false;
        };

        let now = self.clock.now();
        let mut tags = self.tags.lock();
        tags.retain(|_, tag| !tag.is_expired(now));
        let found = tags.values().any(|tag| tag.hash == hash);
        if !found {
            debug!("No live tag with hash {}", hash);
        }
        found
    }

    /// Drop every expired record, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut tags = self.tags.lock();
        let before = tags.len();
        tags.retain(|_, tag| !tag.is_expired(now));
        before - tags.len()
    }

    /// Number of live (unexpired) tags.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let now = self.clock.now();
        self.tags
            .lock()
            .values()
            .filter(|tag| !tag.is_expired(now))
            .count()
    }
}

impl Default for AttributionTagManager {
    fn default() -> Self {
        Self::new()
    }
}
