//! End-to-end tests driving the coordinator with stub platforms.
//!
//! Every test runs against a real SQLite database and a real artifact
//! directory under a temp dir, with simulated time.

mod harness;
mod pipeline_tests;
mod storage_tests;

pub use harness::{StubPost, TestHarness, START};
