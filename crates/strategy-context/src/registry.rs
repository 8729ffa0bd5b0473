//! In-memory tracked-entity store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::records::TrackedEntity;
use crate::sources::EntityRegistry;

/// Explicitly owned registry of tracked symbols.
///
/// Writers belong to the surrounding system; the sandbox only reads through
/// [`EntityRegistry::all_tracked`]. A poisoned lock is recovered rather than
/// propagated so that reads keep their infallible contract.
#[derive(Debug, Default)]
pub struct InMemoryEntityRegistry {
    entities: RwLock<BTreeMap<String, TrackedEntity>>,
}

impl InMemoryEntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `symbol` (stored upper-cased).
    pub fn track(&self, symbol: &str, entity: TrackedEntity) {
        let mut guard = self.entities.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(symbol.trim().to_ascii_uppercase(), entity);
    }

    pub fn get(&self, symbol: &str) -> Option<TrackedEntity> {
        let guard = self.entities.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&symbol.trim().to_ascii_uppercase()).cloned()
    }

    pub fn untrack(&self, symbol: &str) -> Option<TrackedEntity> {
        let mut guard = self.entities.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(&symbol.trim().to_ascii_uppercase())
    }

    pub fn clear(&self) {
        let mut guard = self.entities.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }

    pub fn len(&self) -> usize {
        let guard = self.entities.read().unwrap_or_else(|e| e.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityRegistry for InMemoryEntityRegistry {
    fn all_tracked(&self) -> BTreeMap<String, TrackedEntity> {
        let guard = self.entities.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}
