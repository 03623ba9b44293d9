//! Process-wide library handle cache.
//!
//! # Invariants
//! - A path is loaded at most once per cache, even under concurrent first use.
//! - Cached handles are leaked and live for the rest of the process.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Lazily populated `path -> handle` map.
pub struct LibraryCache<H: 'static> {
    handles: OnceCell<RwLock<HashMap<String, &'static H>>>,
}

impl<H: Send + Sync + 'static> LibraryCache<H> {
    pub const fn new() -> Self {
        Self {
            handles: OnceCell::new(),
        }
    }

    /// Returns the cached handle for `key`, running `load` on first use.
    ///
    /// The presence check is repeated under the write lock, so racing callers
    /// observe one load. A failed load caches nothing.
    pub fn get_or_load<E>(
        &self,
        key: &str,
        load: impl FnOnce() -> Result<H, E>,
    ) -> Result<&'static H, E> {
        let handles = self.handles.get_or_init(Default::default);
        if let Some(handle) = handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(*handle);
        }

        let mut guard = handles.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.get(key) {
            return Ok(*handle);
        }
        let handle: &'static H = Box::leak(Box::new(load()?));
        guard.insert(key.to_string(), handle);
        Ok(handle)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.get().is_some_and(|handles| {
            handles
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(key)
        })
    }

    pub fn len(&self) -> usize {
        self.handles.get().map_or(0, |handles| {
            handles.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Send + Sync + 'static> Default for LibraryCache<H> {
    fn default() -> Self {
        Self::new()
    }
}
