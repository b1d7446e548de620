use crate::{
    loader::{LoadError, LoadGraph, LoadedGraph},
    Radius,
};
use indexmap::IndexMap;
use log::debug;
use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub city: String,
    pub radius: Radius,
}

impl CacheKey {
    pub fn new(city: &str, radius: Radius) -> Self {
        Self {
            city: city.trim().to_string(),
            radius,
        }
    }
}

/// Holds a loaded graph once some caller has finished loading it.
pub type Slot = Arc<OnceCell<Arc<LoadedGraph>>>;

/// Storage behind a [`GraphCache`].
pub trait CacheStore: Send + Sync {
    /// Returns the slot for `key`, inserting an empty one when there is none.
    fn slot(&self, key: &CacheKey) -> Slot;

    /// Removes the loaded graph for `key`, returning whether there was one.
    /// A load still in progress is left alone.
    fn evict(&self, key: &CacheKey) -> bool;

    /// Removes `slot` after a failed load, unless another caller still holds
    /// it and may be retrying the load.
    fn discard_failed(&self, key: &CacheKey, slot: &Slot);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In memory store. Unbounded, or bounded by evicting the least recently used key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    capacity: Option<NonZeroUsize>,
    slots: Mutex<IndexMap<CacheKey, Slot>>,
}

impl MemoryStore {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
            slots: Mutex::default(),
        }
    }

    fn slots(&self) -> MutexGuard<'_, IndexMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for MemoryStore {
    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots();

        // Most recently used keys live at the back.
        if let Some(slot) = slots.shift_remove(key) {
            slots.insert(key.clone(), slot.clone());
            return slot;
        }

        if let Some(capacity) = self.capacity {
            // Slots still loading are skipped, so the store may briefly go over capacity.
            while slots.len() >= capacity.get() {
                let Some(index) = slots.values().position(|slot| slot.initialized()) else {
                    break;
                };
                if let Some((evicted, _)) = slots.shift_remove_index(index) {
                    debug!("evicting {evicted:?}");
                }
            }
        }

        let slot = Slot::default();
        slots.insert(key.clone(), slot.clone());
        slot
    }

    fn evict(&self, key: &CacheKey) -> bool {
        let mut slots = self.slots();
        if slots.get(key).is_some_and(|slot| slot.initialized()) {
            slots.shift_remove(key).is_some()
        } else {
            false
        }
    }

    fn discard_failed(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots();

        // Slots are only handed out under this lock, so the count cannot grow
        // while it is held. Two holders are the store and the failed caller.
        let unshared = slots.get(key).is_some_and(|stored| {
            Arc::ptr_eq(stored, slot) && !stored.initialized() && Arc::strong_count(stored) == 2
        });

        if unshared {
            slots.shift_remove(key);
        }
    }

    fn clear(&self) {
        self.slots().clear();
    }

    fn len(&self) -> usize {
        self.slots().len()
    }
}

/// Loads each (city, radius) once and shares the result.
///
/// Concurrent requests for the same key wait on a single load.
/// A failed load is not kept, so the next request tries again. Callers
/// already waiting on it retry in turn.
#[derive(Debug)]
pub struct GraphCache<L, S = MemoryStore> {
    loader: L,
    store: S,
}

impl<L: LoadGraph> GraphCache<L> {
    pub fn new(loader: L) -> Self {
        Self::with_store(loader, MemoryStore::unbounded())
    }
}

impl<L: LoadGraph, S: CacheStore> GraphCache<L, S> {
    pub fn with_store(loader: L, store: S) -> Self {
        Self { loader, store }
    }

    pub async fn get(&self, city: &str, radius: Radius) -> Result<Arc<LoadedGraph>, LoadError> {
        let key = CacheKey::new(city, radius);
        let slot = self.store.slot(&key);

        let result = slot
            .get_or_try_init(|| async {
                debug!("cache miss for {key:?}");
                self.loader.load(&key.city, key.radius).await.map(Arc::new)
            })
            .await
            .cloned();

        if result.is_err() {
            self.store.discard_failed(&key, &slot);
        }

        result
    }

    pub fn evict(&self, city: &str, radius: Radius) -> bool {
        self.store.evict(&CacheKey::new(city, radius))
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
