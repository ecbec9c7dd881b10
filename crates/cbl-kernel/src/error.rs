use crate::types::{RecordId, ResourceId, Role, SlotKey};

/// Session gate failures.
///
/// None of these are fatal: callers surface them as a rejected action (or a
/// redirect back to the entry page, in UI terms).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No role marker has been established
    #[error("no session established")]
    Unauthenticated,

    /// A marker exists but its role does not satisfy the requirement
    #[error("role '{actual}' may not perform this operation (requires '{required}')")]
    Forbidden { required: Role, actual: Role },

    /// Operator credentials were presented and rejected by the verifier
    #[error("operator credentials rejected")]
    CredentialsRejected,
}

/// Rejections from the availability engine at commit time.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    /// Remaining availability for the `(resource, slot)` pool is zero.
    ///
    /// Also covers consumption against a deleted resource: an unknown
    /// resource reads as fully booked, never as an error in its own right.
    #[error("no capacity left for resource '{resource_id}' in slot '{slot}'")]
    CapacityExceeded {
        resource_id: ResourceId,
        slot: SlotKey,
    },

    /// The requester email already holds a record for this resource
    #[error("'{email}' already holds a record for resource '{resource_id}'")]
    DuplicateConsumption {
        email: String,
        resource_id: ResourceId,
    },
}

/// Combined kernel error.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Resource lookup by id yielded nothing; render as deleted/unknown
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// Record lookup by id yielded nothing
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("gate error: {0}")]
    Gate(#[from] GateError),

    #[error("consume rejected: {0}")]
    Consume(#[from] ConsumeError),

    #[error("store error: {0}")]
    Store(#[from] cbl_store::StoreError),
}

impl KernelError {
    /// Every kernel error is a rejected user action or a recoverable fallback;
    /// nothing here should abort the process.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Result type alias for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;
