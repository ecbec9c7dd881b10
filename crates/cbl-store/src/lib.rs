//! CBL Store - Persistent Key-Value Backing
//!
//! Durable process-wide storage keyed by namespace string, the substrate the
//! record repository sits on. Two backends:
//! - [`MemoryBackend`]: process-local, for tests and throwaway instances
//! - [`FileBackend`]: one JSON document per namespace under a root directory
//!
//! A backend stores opaque JSON payloads; it never interprets them. Read-path
//! corruption is logged and reported as "absent" so callers can fall back to
//! seed data, write-path failures are returned to the caller.

pub mod backend;
pub mod error;
pub mod namespace;

pub use backend::file::FileBackend;
pub use backend::memory::MemoryBackend;
pub use backend::StorageBackend;
pub use error::{StoreError, StoreResult};
pub use namespace::Namespace;
