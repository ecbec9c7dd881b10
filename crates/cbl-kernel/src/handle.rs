use std::sync::Arc;

use cbl_store::{Namespace, StorageBackend};
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::api::{
    ChangeNotifier, ConsumptionLedger, LedgerStats, ResourceCatalog, ResourceFilter,
    SessionControl,
};
use crate::availability;
use crate::error::{ConsumeError, GateError, KernelError, KernelResult};
use crate::notify::{ChangeHub, ChangeListener, SubscriptionId};
use crate::repository::Repository;
use crate::session::{CredentialVerifier, RejectAll, RoleMarker, SessionGate};
use crate::types::{
    ConsumeRequest, ConsumptionRecord, DeletionMode, DuplicateGuard, RecordId, Requester,
    Resource, ResourceId, ResourcePatch, ResourceSpec, Role, SlotKey,
};

/// Ledger configuration, fixed at `open` time. One config describes one
/// instance (one demo deployment): its first-run catalog, its duplicate
/// policy, and its operator credential check.
pub struct LedgerConfig {
    /// Catalog persisted on first run against an empty backing store.
    pub seed_resources: Vec<Resource>,
    pub duplicate_guard: DuplicateGuard,
    pub operator_verifier: Arc<dyn CredentialVerifier>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            seed_resources: Vec::new(),
            duplicate_guard: DuplicateGuard::default(),
            operator_verifier: Arc::new(RejectAll),
        }
    }
}

/// Main ledger handle implementing all operational traits.
///
/// One handle is one logical actor (the source system's "tab"): mutations are
/// serialized behind a single lock, so the read-modify-write cycle against
/// the backing store is single-writer within this process. Two handles over
/// the same durable backend are last-writer-wins and only eventually
/// consistent; the change hub is a refresh hint, not a coordination
/// mechanism.
pub struct LedgerHandle {
    duplicate_guard: DuplicateGuard,
    resources: Repository<Resource>,
    records: Repository<ConsumptionRecord>,
    gate: SessionGate,
    hub: ChangeHub,
    write_lock: Mutex<()>,
}

fn namespace(name: &str) -> Namespace {
    // Only called with the two static identifiers below.
    Namespace::new(name).expect("static namespace identifier")
}

impl LedgerHandle {
    /// Open a ledger over `backend`, bootstrapping both namespaces.
    ///
    /// Seeding is idempotent: an already-populated (or corrupt-but-reseeded)
    /// namespace is left as the persisted state says.
    pub fn open(config: LedgerConfig, backend: Arc<dyn StorageBackend>) -> Self {
        debug!(backend = backend.backend_name(), durable = backend.is_durable(), "opening ledger");
        let resources = Repository::new(
            namespace("resources"),
            backend.clone(),
            config.seed_resources,
        );
        let records = Repository::new(namespace("records"), backend, Vec::new());

        // First-run bootstrap: persist seeds immediately.
        resources.load();
        records.load();

        Self {
            duplicate_guard: config.duplicate_guard,
            resources,
            records,
            gate: SessionGate::new(config.operator_verifier),
            hub: ChangeHub::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn find_resource(&self, id: &ResourceId) -> Option<Resource> {
        self.resources.load().into_iter().find(|r| &r.id == id)
    }

    fn duplicate_for(
        &self,
        records: &[ConsumptionRecord],
        resource_id: &ResourceId,
        requester: &Requester,
    ) -> Option<String> {
        let DuplicateGuard::PerRequesterEmail = self.duplicate_guard else {
            return None;
        };
        let email = requester.email.as_deref()?;
        records
            .iter()
            .filter(|r| &r.resource_id == resource_id)
            .any(|r| {
                r.requester
                    .email
                    .as_deref()
                    .is_some_and(|held| held.eq_ignore_ascii_case(email))
            })
            .then(|| email.to_string())
    }

    fn newest_first(mut records: Vec<ConsumptionRecord>) -> Vec<ConsumptionRecord> {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

impl ResourceCatalog for LedgerHandle {
    fn add_resource(&self, spec: ResourceSpec) -> KernelResult<Resource> {
        self.gate.require(Role::Operator)?;

        let resource = Resource {
            id: ResourceId::generate(),
            name: spec.name,
            category: spec.category,
            description: spec.description,
            capacity: spec.capacity,
            created_at: Utc::now(),
        };

        let _write = self.write_lock.lock();
        self.resources.append(resource.clone())?;
        debug!(resource = %resource.id, capacity = resource.capacity, "resource added");
        self.hub.notify(self.resources.namespace());
        Ok(resource)
    }

    fn update_resource(&self, id: &ResourceId, patch: ResourcePatch) -> KernelResult<Resource> {
        self.gate.require(Role::Operator)?;

        let _write = self.write_lock.lock();
        let touched = self.resources.update_where(
            |r| &r.id == id,
            |r| {
                if let Some(name) = &patch.name {
                    r.name = name.clone();
                }
                if let Some(category) = &patch.category {
                    r.category = category.clone();
                }
                if let Some(description) = &patch.description {
                    r.description = description.clone();
                }
                if let Some(capacity) = patch.capacity {
                    r.capacity = capacity;
                }
            },
        )?;
        if touched == 0 {
            return Err(KernelError::ResourceNotFound(id.clone()));
        }

        self.hub.notify(self.resources.namespace());
        self.find_resource(id)
            .ok_or_else(|| KernelError::ResourceNotFound(id.clone()))
    }

    fn delete_resource(&self, id: &ResourceId, mode: DeletionMode) -> KernelResult<()> {
        self.gate.require(Role::Operator)?;

        let _write = self.write_lock.lock();
        let removed = self.resources.remove_where(|r| &r.id == id)?;
        if removed == 0 {
            return Err(KernelError::ResourceNotFound(id.clone()));
        }
        debug!(resource = %id, ?mode, "resource deleted");
        self.hub.notify(self.resources.namespace());

        if mode == DeletionMode::Cascade {
            let dropped = self.records.remove_where(|r| &r.resource_id == id)?;
            if dropped > 0 {
                debug!(resource = %id, dropped, "cascaded record deletion");
                self.hub.notify(self.records.namespace());
            }
        }
        Ok(())
    }

    fn get_resource(&self, id: &ResourceId) -> KernelResult<Resource> {
        self.find_resource(id)
            .ok_or_else(|| KernelError::ResourceNotFound(id.clone()))
    }

    fn list_resources(&self, filter: &ResourceFilter) -> Vec<Resource> {
        self.resources
            .load()
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect()
    }
}

impl ConsumptionLedger for LedgerHandle {
    fn availability(&self, resource_id: &ResourceId, slot: SlotKey) -> u32 {
        // A deleted or unknown resource reads as fully booked, not as an
        // error.
        let Some(resource) = self.find_resource(resource_id) else {
            return 0;
        };
        availability::remaining(&self.records.load(), &resource, slot)
    }

    fn try_consume(&self, request: ConsumeRequest) -> KernelResult<ConsumptionRecord> {
        self.gate.require(Role::Consumer)?;

        // Authoritative check happens here, inside the lock, not whenever
        // the caller last displayed availability.
        let _write = self.write_lock.lock();
        let records = self.records.load();

        if let Some(email) = self.duplicate_for(&records, &request.resource_id, &request.requester)
        {
            return Err(ConsumeError::DuplicateConsumption {
                email,
                resource_id: request.resource_id,
            }
            .into());
        }

        let remaining = self
            .find_resource(&request.resource_id)
            .map(|resource| availability::remaining(&records, &resource, request.slot))
            .unwrap_or(0);
        if remaining == 0 {
            return Err(ConsumeError::CapacityExceeded {
                resource_id: request.resource_id,
                slot: request.slot,
            }
            .into());
        }

        let record = ConsumptionRecord {
            id: RecordId::generate(),
            resource_id: request.resource_id,
            requester: request.requester,
            slot: request.slot,
            created_at: Utc::now(),
        };
        self.records.append(record.clone())?;
        debug!(record = %record.id, resource = %record.resource_id, slot = %record.slot,
               "consumption recorded");
        self.hub.notify(self.records.namespace());
        Ok(record)
    }

    fn cancel_record(&self, id: &RecordId) -> KernelResult<()> {
        let marker = self.gate.current().ok_or(GateError::Unauthenticated)?;

        let _write = self.write_lock.lock();
        let record = self
            .records
            .load()
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| KernelError::RecordNotFound(id.clone()))?;

        let permitted = marker.role == Role::Operator
            || (marker.role == Role::Consumer && record.requester.id == marker.identity);
        if !permitted {
            return Err(GateError::Forbidden {
                required: Role::Operator,
                actual: marker.role,
            }
            .into());
        }

        self.records.remove_where(|r| &r.id == id)?;
        debug!(record = %id, "record cancelled");
        self.hub.notify(self.records.namespace());
        Ok(())
    }

    fn records_for_requester(&self, requester: &str) -> Vec<ConsumptionRecord> {
        let matches = self
            .records
            .load()
            .into_iter()
            .filter(|r| {
                r.requester.id == requester
                    || r.requester
                        .email
                        .as_deref()
                        .is_some_and(|email| email.eq_ignore_ascii_case(requester))
            })
            .collect();
        Self::newest_first(matches)
    }

    fn records_for_resource(&self, resource_id: &ResourceId) -> Vec<ConsumptionRecord> {
        let matches = self
            .records
            .load()
            .into_iter()
            .filter(|r| &r.resource_id == resource_id)
            .collect();
        Self::newest_first(matches)
    }

    fn stats(&self) -> LedgerStats {
        let records = self.records.load();
        let most_popular = {
            let mut counts: Vec<(ResourceId, usize)> = Vec::new();
            for record in &records {
                match counts.iter_mut().find(|(id, _)| id == &record.resource_id) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((record.resource_id.clone(), 1)),
                }
            }
            counts
                .into_iter()
                .max_by_key(|(_, n)| *n)
                .map(|(id, _)| id)
        };
        LedgerStats {
            resources: self.resources.load().len(),
            records: records.len(),
            most_popular,
        }
    }
}

impl SessionControl for LedgerHandle {
    fn establish(&self, role: Role, identity: &str) -> RoleMarker {
        self.gate.establish(role, identity)
    }

    fn establish_operator(&self, identity: &str, secret: &str) -> Result<RoleMarker, GateError> {
        self.gate.establish_operator(identity, secret)
    }

    fn current(&self) -> Option<RoleMarker> {
        self.gate.current()
    }

    fn require(&self, role: Role) -> Result<RoleMarker, GateError> {
        self.gate.require(role)
    }

    fn sign_out(&self) {
        self.gate.sign_out();
    }
}

impl ChangeNotifier for LedgerHandle {
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.hub.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.hub.unsubscribe(id);
    }
}
