//! Attribution tags.
//!
//! A miner embeds an attribution tag in the social post it publishes for a
//! submission. Validators later fetch the post and check that the tag text
//! refers to a live hash issued by this process.
//!
//! # Wire format
//!
//! ```text
//! Built with Bittensor and TensorFlix - hash <64 lowercase hex characters>
//! ```
//!
//! Tags are generated in exactly that case and validated case-insensitively.
//! A tag is a heuristic marker, not a signed attestation: anyone who can read
//! a live tag can copy it into another post.

mod manager;

pub use manager::{AttributionTag, AttributionTagManager};

/// Seconds after creation at which a tag expires.
pub const TAG_TTL_SECS: f64 = 86_400.0;

/// Literal text preceding the hash in every tag.
pub const TAG_PREFIX: &str = "Built with Bittensor and TensorFlix - hash ";
