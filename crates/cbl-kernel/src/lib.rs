//! CBL Kernel - Capacity-Bounded Record Store
//!
//! Tracks a finite resource pool (equipment units, event seats) against a log
//! of consumption records (bookings, registrations) and answers "how much
//! remains" queries that never go negative and always agree with the record
//! log. Availability is recomputed from the records on every check; there is
//! no counter to drift.
//!
//! The [`LedgerHandle`] is the whole external surface: per-concern traits
//! ([`ResourceCatalog`], [`ConsumptionLedger`], [`SessionControl`],
//! [`ChangeNotifier`]) implemented over an injected
//! [`cbl_store::StorageBackend`]. All operations are synchronous; one handle
//! is one logical writer.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cbl_kernel::{ConsumptionLedger, LedgerConfig, LedgerHandle, SessionControl};
//! use cbl_kernel::types::{ConsumeRequest, Requester, ResourceId, Role, SlotKey};
//! use cbl_store::MemoryBackend;
//!
//! let ledger = LedgerHandle::open(
//!     LedgerConfig {
//!         seed_resources: cbl_kernel::seed::sample_resources(),
//!         ..LedgerConfig::default()
//!     },
//!     Arc::new(MemoryBackend::new()),
//! );
//!
//! ledger.establish(Role::Consumer, "s_1001");
//! let record = ledger.try_consume(ConsumeRequest {
//!     resource_id: ResourceId::new("evt_1"),
//!     slot: SlotKey::Whole,
//!     requester: Requester {
//!         id: "s_1001".into(),
//!         name: "Jane".into(),
//!         email: Some("jane@campus.edu".into()),
//!     },
//! })?;
//! ```

pub mod availability;
pub mod notify;
pub mod repository;
pub mod seed;
pub mod session;
pub mod test_harness;
pub mod types;

pub mod api;
pub mod error;
pub mod handle;

pub use api::*;
pub use error::*;
pub use handle::{LedgerConfig, LedgerHandle};
pub use types::*;

/// Re-export test harness for external use
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};
