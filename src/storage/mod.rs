//! Bounded local storage for submitted media artifacts.
//!
//! Artifacts are plain files under one root directory. Metadata is kept in
//! recency order; when a store pushes the total size over capacity the least
//! recently used artifacts are evicted until it fits again.
//!
//! Artifact names are used verbatim as path components. Callers must reject
//! names containing separators or `..` before handing them in.

mod manager;

pub use manager::{StorageManager, StorageStats};
