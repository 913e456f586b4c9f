//! Unlock progress.
//!
//! Progress is a single number per (visitor, task set): the highest
//! catalog level the visitor may play. Level 0 is always open; passing the
//! task at level `n` opens level `n + 1`. Levels only ever go up.
//!
//! The on-disk store is one small JSON document:
//!
//! ```json
//! { "visitor-1": { "standard": 3 } }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use recall_core::Catalog;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::services::VisitorId;

/// Where unlock levels are kept.
pub trait ProgressStore: Send + Sync {
    /// Stored level for `visitor` in `task_set`, if any.
    ///
    /// # Errors
    /// Backend failures.
    fn load_level(&self, visitor: &VisitorId, task_set: &str) -> Result<Option<usize>>;

    /// Store `level` for `visitor` in `task_set`.
    ///
    /// # Errors
    /// Backend failures.
    fn save_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<()>;

    /// Store `level` only if it is above the stored one, reading and
    /// writing under one lock. Returns the level stored before the call
    /// (0 when there was none).
    ///
    /// # Errors
    /// Backend failures.
    fn raise_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    levels: Mutex<HashMap<(VisitorId, String), usize>>,
}

impl MemoryProgressStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load_level(&self, visitor: &VisitorId, task_set: &str) -> Result<Option<usize>> {
        Ok(self
            .levels
            .lock()
            .get(&(visitor.clone(), task_set.to_string()))
            .copied())
    }

    fn save_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<()> {
        self.levels
            .lock()
            .insert((visitor.clone(), task_set.to_string()), level);
        Ok(())
    }

    fn raise_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<usize> {
        let mut levels = self.levels.lock();
        let stored = levels.entry((visitor.clone(), task_set.to_string())).or_insert(0);
        let previous = *stored;
        *stored = previous.max(level);
        Ok(previous)
    }
}

type ProgressDocument = BTreeMap<VisitorId, BTreeMap<String, usize>>;

/// JSON file store, one document for all visitors.
///
/// A missing file is empty progress. A file that cannot be parsed is
/// logged and treated as empty; the next save replaces it.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonProgressStore {
    /// Store backed by the file at `path` (created on first save).
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "Progress store opened");
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<ProgressDocument> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProgressDocument::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt progress file, starting fresh");
                Ok(ProgressDocument::new())
            }
        }
    }

    fn write_document(&self, doc: &ProgressDocument) -> Result<()> {
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn load_level(&self, visitor: &VisitorId, task_set: &str) -> Result<Option<usize>> {
        let _guard = self.lock.lock();
        Ok(self
            .read_document()?
            .get(visitor)
            .and_then(|sets| sets.get(task_set))
            .copied())
    }

    fn save_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<()> {
        let _guard = self.lock.lock();
        let mut doc = self.read_document()?;
        doc.entry(visitor.clone())
            .or_default()
            .insert(task_set.to_string(), level);
        self.write_document(&doc)
    }

    fn raise_level(&self, visitor: &VisitorId, task_set: &str, level: usize) -> Result<usize> {
        let _guard = self.lock.lock();
        let mut doc = self.read_document()?;
        let levels = doc.entry(visitor.clone()).or_default();
        let previous = levels.get(task_set).copied().unwrap_or(0);
        if level > previous {
            levels.insert(task_set.to_string(), level);
            self.write_document(&doc)?;
        }
        Ok(previous)
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// One visitor's progress through one catalog.
pub struct ProgressTracker {
    visitor: VisitorId,
    catalog: Arc<Catalog>,
    store: Arc<dyn ProgressStore>,
    level: usize,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("visitor", &self.visitor)
            .field("task_set", &self.catalog.name())
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    /// Load `visitor`'s progress. Stored levels past the end of the
    /// catalog are clamped to its last task.
    ///
    /// # Errors
    /// Store failures.
    pub fn load(visitor: VisitorId, catalog: Arc<Catalog>, store: Arc<dyn ProgressStore>) -> Result<Self> {
        let stored = store.load_level(&visitor, catalog.name())?.unwrap_or(0);
        let level = stored.min(catalog.len().saturating_sub(1));
        debug!(visitor = %visitor, task_set = catalog.name(), level, "Progress loaded");
        Ok(Self {
            visitor,
            catalog,
            store,
            level,
        })
    }

    /// The visitor.
    #[must_use]
    pub fn visitor(&self) -> &VisitorId {
        &self.visitor
    }

    /// Highest playable level.
    #[must_use]
    pub fn unlocked_level(&self) -> usize {
        self.level
    }

    /// Whether `task_id` is playable. Unknown tasks are not.
    #[must_use]
    pub fn is_unlocked(&self, task_id: &str) -> bool {
        self.catalog
            .level_of(task_id)
            .is_some_and(|level| level <= self.level)
    }

    /// Open `task_id` (and everything before it). Returns whether the
    /// unlocked level moved.
    ///
    /// # Errors
    /// `TaskNotFound` for unknown tasks; store failures.
    pub fn unlock(&mut self, task_id: &str) -> Result<bool> {
        let level = self
            .catalog
            .level_of(task_id)
            .ok_or_else(|| crate::HostError::TaskNotFound(task_id.to_string()))?;
        self.raise_to(level)
    }

    /// Record that `task_id` was passed, opening the level after it.
    /// Returns the newly unlocked level, if the level moved.
    ///
    /// # Errors
    /// `TaskNotFound` for unknown tasks; store failures.
    pub fn record_pass(&mut self, task_id: &str) -> Result<Option<usize>> {
        let level = self
            .catalog
            .level_of(task_id)
            .ok_or_else(|| crate::HostError::TaskNotFound(task_id.to_string()))?;
        let next = (level + 1).min(self.catalog.len().saturating_sub(1));
        Ok(self.raise_to(next)?.then_some(next))
    }

    fn raise_to(&mut self, level: usize) -> Result<bool> {
        if level <= self.level {
            return Ok(false);
        }
        // Another tracker for the same visitor may have raised the store since
        // this one loaded.
        let stored = self.store.raise_level(&self.visitor, self.catalog.name(), level)?;
        self.level = stored.max(level).min(self.catalog.len().saturating_sub(1));
        if level <= stored {
            debug!(visitor = %self.visitor, task_set = self.catalog.name(), stored, "Level already unlocked elsewhere");
            return Ok(false);
        }
        info!(visitor = %self.visitor, task_set = self.catalog.name(), level, "Level unlocked");
        Ok(true)
    }
}
