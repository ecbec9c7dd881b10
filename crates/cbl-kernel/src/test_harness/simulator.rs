//! Ledger simulator - randomized operation harness
//!
//! Generates a seeded stream of valid, edge-case, and invalid operations,
//! runs them against a [`LedgerHandle`], and checks the ledger invariants
//! after every operation: no `(resource, slot)` pool ever holds more records
//! than its capacity, no record dangles after a cascade deletion, and an
//! unknown resource always reads as zero availability.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::{ConsumptionLedger, ResourceCatalog, ResourceFilter, SessionControl};
use crate::error::KernelError;
use crate::handle::{LedgerConfig, LedgerHandle};
use crate::seed::sample_resources;
use crate::session::DigestVerifier;
use crate::types::{
    ConsumeRequest, DeletionMode, DuplicateGuard, RecordId, Requester, ResourceId, ResourcePatch,
    ResourceSpec, Role, SlotKey,
};
use cbl_store::MemoryBackend;

/// Operator secret the simulator configures its own handles with.
pub const SIM_OPERATOR_SECRET: &str = "sim-operator-secret";

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Distribution of operation types
    pub operation_distribution: OperationDistribution,
    /// Cap on catalog growth
    pub max_resources: usize,
    /// Duplicate policy the target handle was opened with; the expected-
    /// outcome classifier has to agree with the handle about it.
    pub duplicate_guard: DuplicateGuard,
    /// Stop conditions
    pub stop_on_first_violation: bool,
    pub stop_on_error_count: Option<usize>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            operation_distribution: OperationDistribution::default(),
            max_resources: 50,
            duplicate_guard: DuplicateGuard::PerRequesterEmail,
            stop_on_first_violation: true,
            stop_on_error_count: None,
        }
    }
}

/// Probability distribution for operation generation
#[derive(Debug, Clone)]
pub struct OperationDistribution {
    /// Valid operations (normal demand and catalog maintenance)
    pub valid_ops: f64,
    /// Edge cases (boundary pools, churn)
    pub edge_cases: f64,
    /// Invalid operations (should be rejected)
    pub invalid_ops: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            valid_ops: 0.70,
            edge_cases: 0.20,
            invalid_ops: 0.10,
        }
    }
}

/// All operations the simulator can generate
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    // Demand
    Consume {
        resource_id: ResourceId,
        slot: SlotKey,
        requester: Requester,
    },
    CancelOwn {
        record_id: RecordId,
        requester_id: String,
    },

    // Catalog maintenance
    AddResource(ResourceSpec),
    GrowCapacity {
        resource_id: ResourceId,
        extra: u32,
    },
    DeleteResource(ResourceId),

    // Queries
    ListResources {
        filter_text: Option<String>,
    },
    AvailabilityProbe {
        resource_id: ResourceId,
        slot: SlotKey,
    },
    RequesterHistory {
        requester_id: String,
    },
    Stats,
    SignOut,

    // Invalid operations
    ConsumeSignedOut {
        resource_id: ResourceId,
        slot: SlotKey,
        requester: Requester,
    },
    AddResourceAsConsumer(ResourceSpec),
    CancelUnknown,
    OperatorBadSecret,
}

impl SimulatedOperation {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Consume { .. } => "Consume",
            Self::CancelOwn { .. } => "CancelOwn",
            Self::AddResource(_) => "AddResource",
            Self::GrowCapacity { .. } => "GrowCapacity",
            Self::DeleteResource(_) => "DeleteResource",
            Self::ListResources { .. } => "ListResources",
            Self::AvailabilityProbe { .. } => "AvailabilityProbe",
            Self::RequesterHistory { .. } => "RequesterHistory",
            Self::Stats => "Stats",
            Self::SignOut => "SignOut",
            Self::ConsumeSignedOut { .. } => "ConsumeSignedOut",
            Self::AddResourceAsConsumer(_) => "AddResourceAsConsumer",
            Self::CancelUnknown => "CancelUnknown",
            Self::OperatorBadSecret => "OperatorBadSecret",
        }
    }
}

/// Expected result classification for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResult {
    ShouldSucceed,
    ShouldFail,
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// Operation outcome didn't match expectation
    UnexpectedOutcome {
        operation_index: u64,
        operation: SimulatedOperation,
        expected: ExpectedResult,
        actual: Result<String, String>,
    },
    /// Invariant was violated
    Invariant(InvariantViolation),
}

/// A specific invariant violation
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub check: InvariantCheck,
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// No `(resource, slot)` pool holds more records than capacity
    CapacityNeverExceeded,
    /// Cascade deletion leaves no record pointing at a missing resource
    NoDanglingRecords,
    /// Unknown resources read as zero availability
    UnknownResourceReadsAsZero,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub operations_by_type: HashMap<String, u64>,
}

impl OperationStats {
    pub fn record(&mut self, operation: &SimulatedOperation, result: &Result<String, String>) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.type_name().to_string())
            .or_insert(0) += 1;

        match result {
            Ok(_) => self.successful_operations += 1,
            Err(_) => self.failed_operations += 1,
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_resource_count: usize,
    pub final_record_count: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Ledger Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Successful: {}\n", self.stats.successful_operations));
        report.push_str(&format!("Failed: {}\n", self.stats.failed_operations));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));
        report.push_str(&format!("Final Resources: {}\n", self.final_resource_count));
        report.push_str(&format!("Final Records: {}\n", self.final_record_count));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Run the simulator against a fresh in-memory ledger.
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let ledger = LedgerHandle::open(
        LedgerConfig {
            seed_resources: sample_resources(),
            duplicate_guard: config.duplicate_guard,
            operator_verifier: Arc::new(DigestVerifier::from_secret(SIM_OPERATOR_SECRET)),
        },
        Arc::new(MemoryBackend::new()),
    );
    run_simulator_on(&ledger, config)
}

/// Run the simulator against an existing ledger (e.g. one over a file
/// backend). The ledger must accept [`SIM_OPERATOR_SECRET`] for operator
/// establishment and use the config's duplicate guard.
pub fn run_simulator_on(ledger: &LedgerHandle, config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    // Track simulator state
    let mut resources: Vec<ResourceId> = ledger
        .list_resources(&ResourceFilter::default())
        .into_iter()
        .map(|r| r.id)
        .collect();
    let mut records: Vec<(RecordId, String, ResourceId)> = Vec::new();

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config, &resources, &records);
        let expected = classify_expected_result(ledger, &config, &operation);
        let actual = execute_operation(ledger, &operation, &mut resources, &mut records);

        let outcome_matches = matches!(
            (expected, &actual),
            (ExpectedResult::ShouldSucceed, Ok(_)) | (ExpectedResult::ShouldFail, Err(_))
        );

        let actual_str: Result<String, String> = match &actual {
            Ok(msg) => Ok(msg.clone()),
            Err(e) => Err(format!("{e:?}")),
        };

        if !outcome_matches {
            violations.push(Violation::UnexpectedOutcome {
                operation_index: i,
                operation: operation.clone(),
                expected,
                actual: actual_str.clone(),
            });
            if config.stop_on_first_violation {
                break;
            }
            if let Some(max_errors) = config.stop_on_error_count {
                if violations.len() >= max_errors {
                    break;
                }
            }
        }

        // Check all invariants after every operation
        if let Err(inv_violations) = LedgerInvariants::check_all(ledger) {
            for v in inv_violations {
                violations.push(Violation::Invariant(v));
            }
            if config.stop_on_first_violation {
                break;
            }
        }

        stats.record(&operation, &actual_str);
    }

    SimulatorReport {
        config,
        stats,
        violations,
        final_resource_count: resources.len(),
        final_record_count: records.len(),
    }
}

fn sim_requester(i: usize) -> Requester {
    Requester {
        id: format!("s_{i}"),
        name: format!("Student {i}"),
        email: Some(format!("s{i}@campus.edu")),
    }
}

fn sim_slot(rng: &mut StdRng) -> SlotKey {
    if rng.gen_bool(0.4) {
        SlotKey::Whole
    } else {
        let day = rng.gen_range(1..=4);
        SlotKey::Day(NaiveDate::from_ymd_opt(2026, 5, day).expect("valid simulator date"))
    }
}

fn sim_spec(rng: &mut StdRng) -> ResourceSpec {
    ResourceSpec {
        name: format!("Loaner Unit {}", rng.gen_range(100..1000)),
        category: ["Camera", "Computing", "Lighting", "Other"][rng.gen_range(0..4)].to_string(),
        description: String::new(),
        capacity: rng.gen_range(1..=5),
    }
}

/// Generate a random operation based on the distribution
fn generate_operation(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    resources: &[ResourceId],
    records: &[(RecordId, String, ResourceId)],
) -> SimulatedOperation {
    let r: f64 = rng.gen();
    let dist = &config.operation_distribution;

    if r < dist.valid_ops {
        generate_valid_operation(rng, config, resources, records)
    } else if r < dist.valid_ops + dist.edge_cases {
        generate_edge_case_operation(rng, resources)
    } else {
        generate_invalid_operation(rng, resources)
    }
}

fn generate_valid_operation(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    resources: &[ResourceId],
    records: &[(RecordId, String, ResourceId)],
) -> SimulatedOperation {
    if resources.is_empty() {
        return SimulatedOperation::AddResource(sim_spec(rng));
    }

    match rng.gen_range(0..8) {
        0 | 1 => SimulatedOperation::Consume {
            resource_id: resources[rng.gen_range(0..resources.len())].clone(),
            slot: sim_slot(rng),
            requester: sim_requester(rng.gen_range(0..8)),
        },
        2 if !records.is_empty() => {
            let (record_id, requester_id, _) = records[rng.gen_range(0..records.len())].clone();
            SimulatedOperation::CancelOwn {
                record_id,
                requester_id,
            }
        }
        3 if resources.len() < config.max_resources => {
            SimulatedOperation::AddResource(sim_spec(rng))
        }
        4 => SimulatedOperation::GrowCapacity {
            resource_id: resources[rng.gen_range(0..resources.len())].clone(),
            extra: rng.gen_range(1..=3),
        },
        5 => SimulatedOperation::ListResources {
            filter_text: rng.gen_bool(0.5).then(|| "a".to_string()),
        },
        6 => SimulatedOperation::RequesterHistory {
            requester_id: sim_requester(rng.gen_range(0..8)).id,
        },
        _ => SimulatedOperation::Stats,
    }
}

fn generate_edge_case_operation(rng: &mut StdRng, resources: &[ResourceId]) -> SimulatedOperation {
    match rng.gen_range(0..4) {
        0 if resources.len() > 1 => {
            // Keep at least one resource alive so demand ops stay meaningful
            SimulatedOperation::DeleteResource(
                resources[rng.gen_range(0..resources.len())].clone(),
            )
        }
        1 if !resources.is_empty() => SimulatedOperation::AvailabilityProbe {
            resource_id: resources[rng.gen_range(0..resources.len())].clone(),
            slot: sim_slot(rng),
        },
        2 => SimulatedOperation::SignOut,
        _ => SimulatedOperation::Stats,
    }
}

fn generate_invalid_operation(rng: &mut StdRng, resources: &[ResourceId]) -> SimulatedOperation {
    match rng.gen_range(0..5) {
        0 if !resources.is_empty() => SimulatedOperation::ConsumeSignedOut {
            resource_id: resources[rng.gen_range(0..resources.len())].clone(),
            slot: sim_slot(rng),
            requester: sim_requester(rng.gen_range(0..8)),
        },
        1 => SimulatedOperation::AddResourceAsConsumer(sim_spec(rng)),
        2 => SimulatedOperation::CancelUnknown,
        3 => SimulatedOperation::OperatorBadSecret,
        _ => SimulatedOperation::AvailabilityProbe {
            // Unknown resource: succeeds, reading as zero
            resource_id: ResourceId::generate(),
            slot: SlotKey::Whole,
        },
    }
}

/// Classify the expected outcome, using the ledger's own read surface for
/// the context-dependent cases. Runs before the operation executes.
fn classify_expected_result(
    ledger: &LedgerHandle,
    config: &SimulatorConfig,
    operation: &SimulatedOperation,
) -> ExpectedResult {
    match operation {
        SimulatedOperation::Consume {
            resource_id,
            slot,
            requester,
        } => {
            let duplicate = config.duplicate_guard == DuplicateGuard::PerRequesterEmail
                && requester.email.as_deref().is_some_and(|email| {
                    ledger.records_for_resource(resource_id).iter().any(|r| {
                        r.requester
                            .email
                            .as_deref()
                            .is_some_and(|held| held.eq_ignore_ascii_case(email))
                    })
                });
            if duplicate || ledger.availability(resource_id, *slot) == 0 {
                ExpectedResult::ShouldFail
            } else {
                ExpectedResult::ShouldSucceed
            }
        }

        SimulatedOperation::ConsumeSignedOut { .. }
        | SimulatedOperation::AddResourceAsConsumer(_)
        | SimulatedOperation::CancelUnknown
        | SimulatedOperation::OperatorBadSecret => ExpectedResult::ShouldFail,

        _ => ExpectedResult::ShouldSucceed,
    }
}

/// Execute an operation against the ledger
fn execute_operation(
    ledger: &LedgerHandle,
    operation: &SimulatedOperation,
    resources: &mut Vec<ResourceId>,
    records: &mut Vec<(RecordId, String, ResourceId)>,
) -> Result<String, KernelError> {
    match operation {
        SimulatedOperation::Consume {
            resource_id,
            slot,
            requester,
        } => {
            ledger.establish(Role::Consumer, &requester.id);
            let record = ledger.try_consume(ConsumeRequest {
                resource_id: resource_id.clone(),
                slot: *slot,
                requester: requester.clone(),
            })?;
            records.push((record.id.clone(), requester.id.clone(), resource_id.clone()));
            Ok(format!("consumed {}", record.id))
        }
        SimulatedOperation::CancelOwn {
            record_id,
            requester_id,
        } => {
            ledger.establish(Role::Consumer, requester_id);
            ledger.cancel_record(record_id)?;
            records.retain(|(id, _, _)| id != record_id);
            Ok("cancelled".to_string())
        }
        SimulatedOperation::AddResource(spec) => {
            ledger.establish_operator("sim-operator", SIM_OPERATOR_SECRET)?;
            let resource = ledger.add_resource(spec.clone())?;
            resources.push(resource.id.clone());
            Ok(format!("added {}", resource.id))
        }
        SimulatedOperation::GrowCapacity { resource_id, extra } => {
            ledger.establish_operator("sim-operator", SIM_OPERATOR_SECRET)?;
            let current = ledger.get_resource(resource_id)?;
            ledger.update_resource(
                resource_id,
                ResourcePatch {
                    capacity: Some(current.capacity + extra),
                    ..ResourcePatch::default()
                },
            )?;
            Ok(format!("capacity now {}", current.capacity + extra))
        }
        SimulatedOperation::DeleteResource(resource_id) => {
            ledger.establish_operator("sim-operator", SIM_OPERATOR_SECRET)?;
            ledger.delete_resource(resource_id, DeletionMode::Cascade)?;
            resources.retain(|id| id != resource_id);
            records.retain(|(_, _, rid)| rid != resource_id);
            Ok("deleted".to_string())
        }
        SimulatedOperation::ListResources { filter_text } => {
            let filter = match filter_text {
                Some(text) => ResourceFilter::text(text.clone()),
                None => ResourceFilter::default(),
            };
            Ok(format!("{} resources", ledger.list_resources(&filter).len()))
        }
        SimulatedOperation::AvailabilityProbe { resource_id, slot } => {
            Ok(format!("{} left", ledger.availability(resource_id, *slot)))
        }
        SimulatedOperation::RequesterHistory { requester_id } => Ok(format!(
            "{} records",
            ledger.records_for_requester(requester_id).len()
        )),
        SimulatedOperation::Stats => {
            let stats = ledger.stats();
            Ok(format!("{} records total", stats.records))
        }
        SimulatedOperation::SignOut => {
            ledger.sign_out();
            Ok("signed out".to_string())
        }
        SimulatedOperation::ConsumeSignedOut {
            resource_id,
            slot,
            requester,
        } => {
            ledger.sign_out();
            let record = ledger.try_consume(ConsumeRequest {
                resource_id: resource_id.clone(),
                slot: *slot,
                requester: requester.clone(),
            })?;
            Ok(format!("consumed {}", record.id))
        }
        SimulatedOperation::AddResourceAsConsumer(spec) => {
            ledger.establish(Role::Consumer, "s_0");
            let resource = ledger.add_resource(spec.clone())?;
            Ok(format!("added {}", resource.id))
        }
        SimulatedOperation::CancelUnknown => {
            ledger.establish_operator("sim-operator", SIM_OPERATOR_SECRET)?;
            ledger.cancel_record(&RecordId::generate())?;
            Ok("cancelled".to_string())
        }
        SimulatedOperation::OperatorBadSecret => {
            ledger.establish_operator("sim-operator", "wrong-secret")?;
            Ok("established".to_string())
        }
    }
}

/// Ledger invariant checks
pub struct LedgerInvariants;

impl LedgerInvariants {
    /// Check all invariants
    pub fn check_all(ledger: &LedgerHandle) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if let Err(e) = Self::check_capacity_invariant(ledger) {
            violations.push(e);
        }
        if let Err(e) = Self::check_no_dangling_records(ledger) {
            violations.push(e);
        }
        if let Err(e) = Self::check_unknown_reads_as_zero(ledger) {
            violations.push(e);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// For every resource and every slot seen in its records, the record
    /// count must not exceed capacity.
    pub fn check_capacity_invariant(ledger: &LedgerHandle) -> Result<(), InvariantViolation> {
        for resource in ledger.list_resources(&ResourceFilter::default()) {
            let mut per_slot: HashMap<SlotKey, u32> = HashMap::new();
            for record in ledger.records_for_resource(&resource.id) {
                *per_slot.entry(record.slot).or_insert(0) += 1;
            }
            for (slot, count) in per_slot {
                if count > resource.capacity {
                    return Err(InvariantViolation {
                        check: InvariantCheck::CapacityNeverExceeded,
                        details: format!(
                            "resource {} slot {} holds {} records over capacity {}",
                            resource.id, slot, count, resource.capacity
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Under cascade-only deletion every record must reference a live
    /// resource, so the per-resource record counts must add up to the total.
    pub fn check_no_dangling_records(ledger: &LedgerHandle) -> Result<(), InvariantViolation> {
        let accounted: usize = ledger
            .list_resources(&ResourceFilter::default())
            .iter()
            .map(|r| ledger.records_for_resource(&r.id).len())
            .sum();
        let total = ledger.stats().records;
        if accounted != total {
            return Err(InvariantViolation {
                check: InvariantCheck::NoDanglingRecords,
                details: format!("{} records total, {} reachable from resources", total, accounted),
            });
        }
        Ok(())
    }

    /// Availability of a resource that does not exist must be zero.
    pub fn check_unknown_reads_as_zero(ledger: &LedgerHandle) -> Result<(), InvariantViolation> {
        let phantom = ResourceId::new("sim_phantom_resource");
        let remaining = ledger.availability(&phantom, SlotKey::Whole);
        if remaining != 0 {
            return Err(InvariantViolation {
                check: InvariantCheck::UnknownResourceReadsAsZero,
                details: format!("phantom resource reads as {remaining}"),
            });
        }
        Ok(())
    }
}
