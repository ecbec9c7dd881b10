use std::marker::PhantomData;
use std::sync::Arc;

use cbl_store::{Namespace, StorageBackend, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Typed whole-collection view over one storage namespace.
///
/// Every mutation round-trips the entire collection: read, change, replace.
/// There are no partial writes and no in-memory cache, so the persisted
/// payload is always the source of truth. The repository carries its seed:
/// an absent namespace (or one whose payload no longer parses) yields the
/// seed, which is persisted immediately so repeated cold starts see the same
/// collection.
pub struct Repository<T> {
    namespace: Namespace,
    backend: Arc<dyn StorageBackend>,
    seed: Vec<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(namespace: Namespace, backend: Arc<dyn StorageBackend>, seed: Vec<T>) -> Self {
        Self {
            namespace,
            backend,
            seed,
            _marker: PhantomData,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Read the full collection.
    ///
    /// Never fails: a missing namespace bootstraps from the seed, and a
    /// payload that fails to parse is logged and treated the same way. A
    /// failure to persist the seed is logged too; the caller still gets the
    /// seeded collection and the next successful save repairs the namespace.
    pub fn load(&self) -> Vec<T> {
        match self.backend.get(&self.namespace) {
            Some(payload) => match serde_json::from_str::<Vec<T>>(&payload) {
                Ok(items) => items,
                Err(e) => {
                    warn!(namespace = %self.namespace, error = %e,
                          "malformed payload, falling back to seed");
                    self.bootstrap()
                }
            },
            None => self.bootstrap(),
        }
    }

    /// Replace the persisted collection.
    pub fn save(&self, items: &[T]) -> StoreResult<()> {
        let payload =
            serde_json::to_string(items).map_err(|e| cbl_store::StoreError::Serialize {
                namespace: self.namespace.to_string(),
                source: e,
            })?;
        self.backend.put(&self.namespace, &payload)
    }

    /// Read, push, replace.
    pub fn append(&self, item: T) -> StoreResult<()> {
        let mut items = self.load();
        items.push(item);
        self.save(&items)
    }

    /// Read, drop matches, replace. Returns the number of removed items.
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> StoreResult<usize> {
        let mut items = self.load();
        let before = items.len();
        items.retain(|item| !predicate(item));
        let removed = before - items.len();
        if removed > 0 {
            self.save(&items)?;
        }
        Ok(removed)
    }

    /// Read, mutate matches in place, replace. Returns the number touched.
    pub fn update_where(
        &self,
        predicate: impl Fn(&T) -> bool,
        mut mutate: impl FnMut(&mut T),
    ) -> StoreResult<usize> {
        let mut items = self.load();
        let mut touched = 0;
        for item in items.iter_mut().filter(|item| predicate(item)) {
            mutate(item);
            touched += 1;
        }
        if touched > 0 {
            self.save(&items)?;
        }
        Ok(touched)
    }

    fn bootstrap(&self) -> Vec<T> {
        debug!(namespace = %self.namespace, count = self.seed.len(), "seeding namespace");
        if let Err(e) = self.save(&self.seed) {
            warn!(namespace = %self.namespace, error = %e, "failed to persist seed");
        }
        self.seed.clone()
    }
}
