use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::model::CallTree;
use crate::parsers::{self, SourceError};

type Slot = Arc<Mutex<Option<Arc<CallTree>>>>;

/// Built call trees keyed by the results directory they came from.
///
/// Each source is parsed at most once: concurrent requests for the same
/// source wait on that source's slot while the first one builds, and
/// requests for other sources are not blocked. A failed build leaves the
/// slot empty so a later request can retry.
#[derive(Debug, Default)]
pub struct TreeCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic mid-build leaves the slot `None`, which is still consistent.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree for the results directory `source`, reading its
    /// `profiling.json` on first use.
    pub fn get_or_load(&self, source: &Path) -> Result<Arc<CallTree>, SourceError> {
        self.get_or_build(source, parsers::load_tree)
    }

    /// Tree for `source`, calling `build` only if no tree is cached yet.
    pub fn get_or_build<F>(&self, source: &Path, build: F) -> Result<Arc<CallTree>, SourceError>
    where
        F: FnOnce(&Path) -> Result<CallTree, SourceError>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(source.to_path_buf()).or_default())
        };

        let mut tree = lock(&slot);
        if let Some(tree) = tree.as_ref() {
            debug!(source = %source.display(), "call tree cache hit");
            return Ok(Arc::clone(tree));
        }
        let built = Arc::new(build(source)?);
        *tree = Some(Arc::clone(&built));
        Ok(built)
    }

    pub fn get(&self, source: &Path) -> Option<Arc<CallTree>> {
        let slot = lock(&self.slots).get(source).cloned()?;
        lock(&slot).clone()
    }

    /// Forget the tree for `source`. Returns whether one was cached.
    pub fn invalidate(&self, source: &Path) -> bool {
        lock(&self.slots)
            .remove(source)
            .is_some_and(|slot| lock(&slot).is_some())
    }

    /// Number of sources with a built tree.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
