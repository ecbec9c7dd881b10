//! Negative tests - rejections, gate failures, and edge policies

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use cbl_kernel::session::DigestVerifier;
use cbl_kernel::*;
use cbl_store::MemoryBackend;

const OPERATOR_SECRET: &str = "operator-secret";

fn resource(id: &str, name: &str, capacity: u32) -> Resource {
    Resource {
        id: ResourceId::new(id),
        name: name.to_string(),
        category: "General".to_string(),
        description: String::new(),
        capacity,
        created_at: Utc::now(),
    }
}

fn ledger_with(seed: Vec<Resource>, guard: DuplicateGuard) -> LedgerHandle {
    LedgerHandle::open(
        LedgerConfig {
            seed_resources: seed,
            duplicate_guard: guard,
            operator_verifier: Arc::new(DigestVerifier::from_secret(OPERATOR_SECRET)),
        },
        Arc::new(MemoryBackend::new()),
    )
}

fn requester(id: &str, email: Option<&str>) -> Requester {
    Requester {
        id: id.to_string(),
        name: format!("Student {id}"),
        email: email.map(str::to_string),
    }
}

fn consume(ledger: &LedgerHandle, resource_id: &str, slot: SlotKey, who: Requester) -> KernelResult<ConsumptionRecord> {
    ledger.try_consume(ConsumeRequest {
        resource_id: ResourceId::new(resource_id),
        slot,
        requester: who,
    })
}

fn day(d: u32) -> SlotKey {
    SlotKey::Day(NaiveDate::from_ymd_opt(2026, 6, d).unwrap())
}

#[test]
fn test_rejects_consumption_when_exhausted() {
    let ledger = ledger_with(vec![resource("eq_1", "Epson Projector", 1)], DuplicateGuard::Off);
    ledger.establish(Role::Consumer, "s_1");

    // capacity 1: first claim succeeds
    consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap();

    // immediate second claim for the same (resource, slot) is rejected
    let err = consume(&ledger, "eq_1", day(1), requester("s_2", None)).unwrap_err();
    assert!(
        matches!(
            err,
            KernelError::Consume(ConsumeError::CapacityExceeded { .. })
        ),
        "exhausted pool should reject, got {err:?}"
    );

    // a different slot on the same resource has its own pool
    consume(&ledger, "eq_1", day(2), requester("s_2", None)).unwrap();
}

#[test]
fn test_duplicate_guard_rejects_same_email() {
    let ledger = ledger_with(
        vec![resource("evt_1", "Tech Quiz Championship", 50)],
        DuplicateGuard::PerRequesterEmail,
    );
    ledger.establish(Role::Consumer, "s_1");

    consume(
        &ledger,
        "evt_1",
        SlotKey::Whole,
        requester("s_1", Some("a@x.com")),
    )
    .unwrap();

    // Same email, different requester id and letter case: still a duplicate
    let err = consume(
        &ledger,
        "evt_1",
        SlotKey::Whole,
        requester("s_2", Some("A@X.COM")),
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            KernelError::Consume(ConsumeError::DuplicateConsumption { .. })
        ),
        "duplicate email should reject even with seats left, got {err:?}"
    );

    // Capacity was untouched by the rejected attempt
    assert_eq!(ledger.availability(&ResourceId::new("evt_1"), SlotKey::Whole), 49);
}

#[test]
fn test_duplicate_guard_off_allows_repeat_email() {
    let ledger = ledger_with(
        vec![resource("evt_1", "Tech Quiz Championship", 50)],
        DuplicateGuard::Off,
    );
    ledger.establish(Role::Consumer, "s_1");

    consume(&ledger, "evt_1", SlotKey::Whole, requester("s_1", Some("a@x.com"))).unwrap();
    consume(&ledger, "evt_1", SlotKey::Whole, requester("s_1", Some("a@x.com"))).unwrap();
    assert_eq!(ledger.records_for_requester("a@x.com").len(), 2);
}

#[test]
fn test_require_without_session_is_unauthenticated() {
    let ledger = ledger_with(vec![], DuplicateGuard::Off);
    assert!(matches!(
        ledger.require(Role::Operator),
        Err(GateError::Unauthenticated)
    ));
}

#[test]
fn test_require_with_consumer_session_is_forbidden() {
    let ledger = ledger_with(vec![], DuplicateGuard::Off);
    ledger.establish(Role::Consumer, "s_1");
    assert!(matches!(
        ledger.require(Role::Operator),
        Err(GateError::Forbidden { .. })
    ));
}

#[test]
fn test_consume_without_session_is_rejected() {
    let ledger = ledger_with(vec![resource("eq_1", "Canon EOS 90D", 3)], DuplicateGuard::Off);

    let err = consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap_err();
    assert!(matches!(
        err,
        KernelError::Gate(GateError::Unauthenticated)
    ));
}

#[test]
fn test_catalog_mutation_as_consumer_is_forbidden() {
    let ledger = ledger_with(vec![resource("eq_1", "Canon EOS 90D", 3)], DuplicateGuard::Off);
    ledger.establish(Role::Consumer, "s_1");

    let err = ledger
        .add_resource(ResourceSpec {
            name: "Sneaky Item".to_string(),
            category: "Other".to_string(),
            description: String::new(),
            capacity: 1,
        })
        .unwrap_err();
    assert!(matches!(err, KernelError::Gate(GateError::Forbidden { .. })));

    let err = ledger
        .delete_resource(&ResourceId::new("eq_1"), DeletionMode::Cascade)
        .unwrap_err();
    assert!(matches!(err, KernelError::Gate(GateError::Forbidden { .. })));
}

#[test]
fn test_cancel_permissions() {
    let ledger = ledger_with(vec![resource("eq_1", "Canon EOS 90D", 3)], DuplicateGuard::Off);

    ledger.establish(Role::Consumer, "s_1");
    let record = consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap();

    // Another consumer may not cancel it
    ledger.establish(Role::Consumer, "s_2");
    let err = ledger.cancel_record(&record.id).unwrap_err();
    assert!(matches!(err, KernelError::Gate(GateError::Forbidden { .. })));

    // The creator may
    ledger.establish(Role::Consumer, "s_1");
    ledger.cancel_record(&record.id).unwrap();

    // And so may an operator
    let record = consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap();
    ledger.establish_operator("ops", OPERATOR_SECRET).unwrap();
    ledger.cancel_record(&record.id).unwrap();
}

#[test]
fn test_cancel_unknown_record_is_not_found() {
    let ledger = ledger_with(vec![], DuplicateGuard::Off);
    ledger.establish_operator("ops", OPERATOR_SECRET).unwrap();

    let err = ledger.cancel_record(&RecordId::new("rec_missing")).unwrap_err();
    assert!(matches!(err, KernelError::RecordNotFound(_)));
}

#[test]
fn test_deleted_resource_reads_as_fully_booked() {
    let ledger = ledger_with(vec![resource("eq_1", "Canon EOS 90D", 3)], DuplicateGuard::Off);
    let eq1 = ResourceId::new("eq_1");

    ledger.establish_operator("ops", OPERATOR_SECRET).unwrap();
    ledger.delete_resource(&eq1, DeletionMode::Cascade).unwrap();

    // Availability of a missing resource is zero, not an error
    assert_eq!(ledger.availability(&eq1, day(1)), 0);

    ledger.establish(Role::Consumer, "s_1");
    let err = consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap_err();
    assert!(matches!(
        err,
        KernelError::Consume(ConsumeError::CapacityExceeded { .. })
    ));
}

#[test]
fn test_capacity_shrink_below_count_clamps_to_zero() {
    let ledger = ledger_with(
        vec![resource("evt_1", "Cultural Dance Performance", 3)],
        DuplicateGuard::Off,
    );
    let evt1 = ResourceId::new("evt_1");

    ledger.establish(Role::Consumer, "s_1");
    for who in ["s_1", "s_2", "s_3"] {
        consume(&ledger, "evt_1", SlotKey::Whole, requester(who, None)).unwrap();
    }

    // Operator edits the limit below the live record count
    ledger.establish_operator("ops", OPERATOR_SECRET).unwrap();
    ledger
        .update_resource(
            &evt1,
            ResourcePatch {
                capacity: Some(1),
                ..ResourcePatch::default()
            },
        )
        .unwrap();

    // Existing records stay; availability clamps instead of going negative
    assert_eq!(ledger.records_for_resource(&evt1).len(), 3);
    assert_eq!(ledger.availability(&evt1, SlotKey::Whole), 0);

    ledger.establish(Role::Consumer, "s_4");
    assert!(consume(&ledger, "evt_1", SlotKey::Whole, requester("s_4", None)).is_err());
}

#[test]
fn test_update_and_delete_unknown_resource() {
    let ledger = ledger_with(vec![], DuplicateGuard::Off);
    ledger.establish_operator("ops", OPERATOR_SECRET).unwrap();

    let ghost = ResourceId::new("eq_ghost");
    assert!(matches!(
        ledger.update_resource(&ghost, ResourcePatch::default()),
        Err(KernelError::ResourceNotFound(_))
    ));
    assert!(matches!(
        ledger.delete_resource(&ghost, DeletionMode::Detach),
        Err(KernelError::ResourceNotFound(_))
    ));
}

#[test]
fn test_operator_login_with_bad_secret_is_rejected() {
    let ledger = ledger_with(vec![], DuplicateGuard::Off);

    assert!(matches!(
        ledger.establish_operator("ops", "not-the-secret"),
        Err(GateError::CredentialsRejected)
    ));
    // The failed attempt must not leave a session behind
    assert!(ledger.current().is_none());
}

#[test]
fn test_sign_out_revokes_access() {
    let ledger = ledger_with(vec![resource("eq_1", "Canon EOS 90D", 3)], DuplicateGuard::Off);
    ledger.establish(Role::Consumer, "s_1");
    ledger.sign_out();

    let err = consume(&ledger, "eq_1", day(1), requester("s_1", None)).unwrap_err();
    assert!(matches!(err, KernelError::Gate(GateError::Unauthenticated)));
}
