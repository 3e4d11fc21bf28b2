//! LRU-evicting artifact store.

use crate::clock::{self, Clock};
use crate::error::{Error, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct ArtifactMeta {
    size: u64,
    last_access: f64,
}

/// Tracked artifacts, least recently used first when popping.
struct Index {
    entries: LruCache<String, ArtifactMeta>,
    total_size: u64,
}

impl Index {
    fn insert(&mut self, name: String, meta: ArtifactMeta) {
        if let Some(old) = self.entries.put(name, meta) {
            self.total_size -= old.size;
        }
        self.total_size += meta.size;
    }

    fn remove(&mut self, name: &str) -> Option<ArtifactMeta> {
        let meta = self.entries.pop(name)?;
        self.total_size -= meta.size;
        Some(meta)
    }

    fn pop_lru(&mut self) -> Option<(String, ArtifactMeta)> {
        let (name, meta) = self.entries.pop_lru()?;
        self.total_size -= meta.size;
        Some((name, meta))
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of tracked artifacts.
    pub count: usize,
    /// Total bytes of tracked artifacts.
    pub size: u64,
}

/// Manages artifact files under a root directory with LRU eviction.
///
/// All public operations hold an internal lock for their whole duration, so
/// eviction and recency updates are never interleaved.
pub struct StorageManager {
    root: PathBuf,
    /// Capacity in bytes; 0 means unlimited.
    max_size: u64,
    index: Mutex<Index>,
    clock: Arc<dyn Clock>,
}

impl StorageManager {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn new(root: impl Into<PathBuf>, max_size: u64) -> Result<Self> {
        Self::with_clock(root, max_size, clock::system())
    }

    /// Like [`new`](Self::new), reading access times from `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn with_clock(
        root: impl Into<PathBuf>,
        max_size: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!(
            "Storage manager at {} (max_size={})",
            root.display(),
            max_size
        );

        Ok(Self {
            root,
            max_size,
            index: Mutex::new(Index {
                entries: LruCache::unbounded(),
                total_size: 0,
            }),
            clock,
        })
    }

    /// Path an artifact named `name` is stored at.
    #[must_use]
    pub fn storage_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Copy `source` into the store and return its stored path.
    ///
    /// The artifact is named `name`, or the source file name when `None`.
    /// An existing artifact with the same name is overwritten. The new
    /// artifact becomes most recently used and eviction runs afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has no file name, is the stored
    /// artifact itself, or the copy fails.
    pub fn store_file(&self, source: &Path, name: Option<&str>) -> Result<PathBuf> {
        let name = match name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::Invalid(format!("no file name in {}", source.display()))
                })?,
        };

        let mut index = self.index.lock();
        let dest = self.storage_path(&name);
        // Copying a file onto itself truncates it before it is read.
        if dest.exists() && fs::canonicalize(source)? == fs::canonicalize(&dest)? {
            return Err(Error::Invalid(format!(
                "{} is already stored as {}",
                source.display(),
                name
            )));
        }
        fs::copy(source, &dest)?;
        let size = fs::metadata(&dest)?.len();
        debug!("Stored {} ({} bytes)", name, size);

        index.insert(
            name,
            ArtifactMeta {
                size,
                last_access: self.clock.now(),
            },
        );
        self.evict_locked(&mut index);
        Ok(dest)
    }

    /// Evict least recently used artifacts until the total fits capacity.
    pub fn evict_if_needed(&self) {
        let mut index = self.index.lock();
        self.evict_locked(&mut index);
    }

    fn evict_locked(&self, index: &mut Index) {
        while self.max_size > 0 && index.total_size > self.max_size {
            let Some((name, meta)) = index.pop_lru() else {
                break;
            };
            info!("Evicting {} ({} bytes)", name, meta.size);
            if let Err(e) = fs::remove_file(self.storage_path(&name)) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove evicted artifact {}: {}", name, e);
                }
            }
        }
    }

    /// Path of a stored artifact, marking it most recently used.
    ///
    /// Returns `None` when the backing file does not exist. Stale metadata
    /// is left for [`detect_corruption`](Self::detect_corruption) to repair.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.storage_path(name);
        if !path.is_file() {
            return None;
        }

        let mut index = self.index.lock();
        if let Some(meta) = index.entries.get_mut(name) {
            meta.last_access = self.clock.now();
        }
        Some(path)
    }

    /// Delete an artifact's file (if present) and forget it.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        let mut index = self.index.lock();
        self.delete_locked(&mut index, name)
    }

    fn delete_locked(&self, index: &mut Index, name: &str) -> Result<()> {
        match fs::remove_file(self.storage_path(name)) {
            Ok(()) => debug!("Deleted {}", name),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        index.remove(name);
        Ok(())
    }

    /// Delete every artifact not accessed within `max_age`.
    ///
    /// Returns the deleted names.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be removed.
    pub fn cleanup_old_files(&self, max_age: Duration) -> Result<Vec<String>> {
        let cutoff = self.clock.now() - max_age.as_secs_f64();
        let mut index = self.index.lock();

        let stale: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, meta)| meta.last_access < cutoff)
            .map(|(name, _)| name.clone())
            .collect();

        for name in &stale {
            self.delete_locked(&mut index, name)?;
        }
        if !stale.is_empty() {
            info!("Cleaned up {} stale artifacts", stale.len());
        }
        Ok(stale)
    }

    /// Check every tracked artifact's file still exists.
    ///
    /// Returns per-name status; entries whose file is missing are dropped
    /// from metadata.
    #[must_use]
    pub fn detect_corruption(&self) -> BTreeMap<String, bool> {
        let mut index = self.index.lock();
        let names: Vec<String> = index.entries.iter().map(|(name, _)| name.clone()).collect();

        let mut status = BTreeMap::new();
        for name in names {
            let present = self.storage_path(&name).is_file();
            if !present {
                warn!("Artifact {} is missing on disk, dropping metadata", name);
                index.remove(&name);
            }
            status.insert(name, present);
        }
        status
    }

    /// Copy every tracked artifact into `dest_dir`, keeping names.
    ///
    /// Returns the number of files copied.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a copy fails.
    pub fn backup(&self, dest_dir: &Path) -> Result<usize> {
        fs::create_dir_all(dest_dir)?;
        let index = self.index.lock();

        let mut copied = 0;
        for (name, _) in &index.entries {
            fs::copy(self.storage_path(name), dest_dir.join(name))?;
            copied += 1;
        }
        info!("Backed up {} artifacts to {}", copied, dest_dir.display());
        Ok(copied)
    }

    /// Total bytes of tracked artifacts.
    #[must_use]
    pub fn storage_size(&self) -> u64 {
        self.index.lock().total_size
    }

    /// Count and size of tracked artifacts.
    #[must_use]
    pub fn stats(&self) -> StorageStats {
        let index = self.index.lock();
        StorageStats {
            count: index.entries.len(),
            size: index.total_size,
        }
    }

    /// Whether `name` is tracked.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.lock().entries.contains(name)
    }

    /// Number of tracked artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.lock().entries.is_empty()
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
