use std::collections::HashMap;

use parking_lot::RwLock;

use crate::backend::StorageBackend;
use crate::error::StoreResult;
use crate::namespace::Namespace;

/// In-memory backend.
///
/// The substitutable fake for tests, and the right choice for instances that
/// do not need to survive a restart. Payloads live in a map behind an
/// `RwLock`; nothing is validated because nothing can corrupt.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    payloads: RwLock<HashMap<Namespace, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of namespaces currently held.
    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, namespace: &Namespace) -> Option<String> {
        self.payloads.read().get(namespace).cloned()
    }

    fn put(&self, namespace: &Namespace, payload: &str) -> StoreResult<()> {
        self.payloads
            .write()
            .insert(namespace.clone(), payload.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &Namespace) -> StoreResult<()> {
        self.payloads.write().remove(namespace);
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
