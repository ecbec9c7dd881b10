use crate::error::StoreResult;
use crate::namespace::Namespace;

pub mod file;
pub mod memory;

/// Durable mapping from a namespace to one opaque JSON document.
///
/// The backend is the single-writer-at-a-time resource of the system: callers
/// serialize their read-modify-write cycles above this trait, the backend
/// only guarantees that an individual `put` is observed whole or not at all.
pub trait StorageBackend: Send + Sync {
    /// Return the current payload for `namespace`.
    ///
    /// Absent namespaces and payloads that cannot be read back are both
    /// reported as `None`; the latter is logged by the backend. Callers treat
    /// `None` as "fall back to seed data".
    fn get(&self, namespace: &Namespace) -> Option<String>;

    /// Replace the payload for `namespace`.
    fn put(&self, namespace: &Namespace, payload: &str) -> StoreResult<()>;

    /// Drop the namespace and its payload.
    fn remove(&self, namespace: &Namespace) -> StoreResult<()>;

    /// Whether payloads survive process restart.
    fn is_durable(&self) -> bool;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}
