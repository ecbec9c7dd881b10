use crate::types::{ConsumptionRecord, Resource, SlotKey};

/// Count the records competing for one `(resource, slot)` pool.
pub fn consumed(records: &[ConsumptionRecord], resource: &Resource, slot: SlotKey) -> u32 {
    records
        .iter()
        .filter(|r| r.resource_id == resource.id && r.slot == slot)
        .count() as u32
}

/// Remaining capacity for a `(resource, slot)` pool, clamped at zero.
///
/// Always recomputed from the record log. Keeping no running counter means
/// there is nothing to drift out of sync with the records; the O(n) scan is
/// the price, and the backing store reads whole collections anyway.
pub fn remaining(records: &[ConsumptionRecord], resource: &Resource, slot: SlotKey) -> u32 {
    resource.capacity.saturating_sub(consumed(records, resource, slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, Requester, ResourceId};
    use chrono::{NaiveDate, Utc};

    fn resource(capacity: u32) -> Resource {
        Resource {
            id: ResourceId::new("eq_1"),
            name: "Canon EOS 90D".to_string(),
            category: "Camera".to_string(),
            description: String::new(),
            capacity,
            created_at: Utc::now(),
        }
    }

    fn record(resource_id: &str, slot: SlotKey) -> ConsumptionRecord {
        ConsumptionRecord {
            id: RecordId::generate(),
            resource_id: ResourceId::new(resource_id),
            requester: Requester {
                id: "s1".to_string(),
                name: "Student".to_string(),
                email: None,
            },
            slot,
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> SlotKey {
        SlotKey::Day(NaiveDate::from_ymd_opt(2026, 4, d).unwrap())
    }

    #[test]
    fn empty_log_leaves_full_capacity() {
        assert_eq!(remaining(&[], &resource(3), day(1)), 3);
    }

    #[test]
    fn counts_only_matching_resource_and_slot() {
        let records = vec![
            record("eq_1", day(1)),
            record("eq_1", day(2)),
            record("eq_2", day(1)),
        ];
        assert_eq!(remaining(&records, &resource(3), day(1)), 2);
    }

    #[test]
    fn clamps_at_zero_when_overcommitted() {
        // Capacity edited below the live record count: reads as full, not
        // negative.
        let records = vec![record("eq_1", SlotKey::Whole), record("eq_1", SlotKey::Whole)];
        assert_eq!(remaining(&records, &resource(1), SlotKey::Whole), 0);
    }

    #[test]
    fn whole_pool_and_day_pools_are_independent() {
        let records = vec![record("eq_1", SlotKey::Whole)];
        assert_eq!(remaining(&records, &resource(1), SlotKey::Whole), 0);
        assert_eq!(remaining(&records, &resource(1), day(1)), 1);
    }
}
