//! Post authenticity verification.
//!
//! A post is authentic when its text carries a live attribution tag and it
//! was published within the allowed drift of the reference time. Every
//! uncertain outcome is a rejection.

mod authenticity;
mod temporal;

pub use authenticity::{ContentAuthenticityVerifier, VerificationReport};
pub use temporal::TemporalVerifier;
