use crate::error::{GateError, KernelResult};
use crate::notify::{ChangeListener, SubscriptionId};
use crate::session::RoleMarker;
use crate::types::{
    ConsumeRequest, ConsumptionRecord, DeletionMode, RecordId, Resource, ResourceId,
    ResourcePatch, ResourceSpec, Role, SlotKey,
};

/// Query for `list_resources`.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Case-insensitive substring match against name and description.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
}

impl ResourceFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            category: None,
        }
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        let text_ok = self.text.as_deref().map_or(true, |needle| {
            let needle = needle.to_lowercase();
            resource.name.to_lowercase().contains(&needle)
                || resource.description.to_lowercase().contains(&needle)
        });
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| resource.category == category);
        text_ok && category_ok
    }
}

/// Aggregate counts for a dashboard view.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub resources: usize,
    pub records: usize,
    /// Resource holding the most records, if any records exist.
    pub most_popular: Option<ResourceId>,
}

/// Operator-side catalog maintenance. Mutations require an operator session;
/// reads are open.
pub trait ResourceCatalog {
    fn add_resource(&self, spec: ResourceSpec) -> KernelResult<Resource>;
    fn update_resource(&self, id: &ResourceId, patch: ResourcePatch) -> KernelResult<Resource>;
    fn delete_resource(&self, id: &ResourceId, mode: DeletionMode) -> KernelResult<()>;
    fn get_resource(&self, id: &ResourceId) -> KernelResult<Resource>;
    fn list_resources(&self, filter: &ResourceFilter) -> Vec<Resource>;
}

/// Demand against the catalog: availability queries and record lifecycle.
pub trait ConsumptionLedger {
    /// Remaining capacity for the `(resource, slot)` pool; 0 for an unknown
    /// resource, never negative, never an error.
    fn availability(&self, resource_id: &ResourceId, slot: SlotKey) -> u32;

    /// Commit one unit of demand. The availability and duplicate checks run
    /// at commit time, under the mutation lock; whatever a display showed
    /// earlier is advisory only.
    fn try_consume(&self, request: ConsumeRequest) -> KernelResult<ConsumptionRecord>;

    /// Hard-delete a record. Permitted to an operator, or to the consumer
    /// whose session identity matches the record's requester.
    fn cancel_record(&self, id: &RecordId) -> KernelResult<()>;

    /// Records whose requester id (or email, compared case-insensitively)
    /// matches. Newest first.
    fn records_for_requester(&self, requester: &str) -> Vec<ConsumptionRecord>;

    /// Records against one resource, newest first. Dangling records (after a
    /// `Detach` deletion) are included.
    fn records_for_resource(&self, resource_id: &ResourceId) -> Vec<ConsumptionRecord>;

    fn stats(&self) -> LedgerStats;
}

/// The role gate.
pub trait SessionControl {
    /// Store a role marker for the process lifetime of this handle.
    fn establish(&self, role: Role, identity: &str) -> RoleMarker;

    /// Establish an operator marker after credential verification.
    fn establish_operator(&self, identity: &str, secret: &str) -> Result<RoleMarker, GateError>;

    fn current(&self) -> Option<RoleMarker>;
    fn require(&self, role: Role) -> Result<RoleMarker, GateError>;
    fn sign_out(&self);
}

/// Subscription surface for the change-notification hub.
pub trait ChangeNotifier {
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn resource(name: &str, category: &str, description: &str) -> Resource {
        Resource {
            id: ResourceId::generate(),
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            capacity: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ResourceFilter::default();
        assert!(filter.matches(&resource("Canon EOS 90D", "Camera", "")));
    }

    #[test]
    fn text_filter_is_case_insensitive_over_name_and_description() {
        let filter = ResourceFilter::text("CANON");
        assert!(filter.matches(&resource("Canon EOS 90D", "Camera", "")));

        let filter = ResourceFilter::text("quiz");
        assert!(filter.matches(&resource(
            "Tech Championship",
            "Technical",
            "A Quiz covering programming"
        )));
        assert!(!filter.matches(&resource("Cricket Tournament", "Sports", "")));
    }

    #[test]
    fn category_filter_is_exact() {
        let filter = ResourceFilter {
            text: None,
            category: Some("Camera".to_string()),
        };
        assert!(filter.matches(&resource("Canon EOS 90D", "Camera", "")));
        assert!(!filter.matches(&resource("Dell XPS 15", "Computing", "")));
    }
}
