use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque resource identifier.
///
/// Generated ids carry a `res_` prefix; seed catalogs may use any string
/// (`evt_1`, `eq_3`) and the engine never inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("res_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque consumption-record identifier, generated at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("rec_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The dimension capacity is scoped to.
///
/// Date-sliced resources (equipment) compete per calendar day; whole-pool
/// resources (event seats) use the `Whole` sentinel so every record competes
/// for the same pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    Day(NaiveDate),
    Whole,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Day(date) => write!(f, "{date}"),
            SlotKey::Whole => f.write_str("whole"),
        }
    }
}

/// Acting role for the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Operator => f.write_str("operator"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

/// A bookable/orderable unit with finite capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Total concurrent (or per-slot) units available.
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a [`Resource`]; id and timestamp are assigned by the
/// catalog.
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub name: String,
    pub category: String,
    pub description: String,
    pub capacity: u32,
}

/// Operator-editable fields of a [`Resource`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<u32>,
}

/// The consumer a record belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

/// One accepted claim against a resource's capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub id: RecordId,
    /// Weak reference: may dangle after a `Detach`-mode resource deletion.
    pub resource_id: ResourceId,
    pub requester: Requester,
    pub slot: SlotKey,
    pub created_at: DateTime<Utc>,
}

/// Input to `try_consume`.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub resource_id: ResourceId,
    pub slot: SlotKey,
    pub requester: Requester,
}

/// What happens to dependent records when a resource is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// Remove the resource's records along with it (fest-style).
    Cascade,
    /// Leave records in place, enumerable but dangling (equipment-style).
    Detach,
}

/// Duplicate-consumption policy applied at `try_consume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateGuard {
    /// One record per requester email per resource, email compared
    /// case-insensitively. Requests without an email are not guarded.
    PerRequesterEmail,
    #[default]
    Off,
}
