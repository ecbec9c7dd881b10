// Test harness module
// Randomized operation simulator for the ledger

pub mod simulator;

pub use simulator::*;

/// Test harness for running stress tests
pub struct TestHarness;

impl TestHarness {
    /// Run a stress test with the specified parameters
    pub fn run_stress_test(resources: usize, iterations: usize) -> StressTestReport {
        let config = SimulatorConfig {
            seed: 12345,
            total_operations: iterations as u64,
            max_resources: resources,
            ..Default::default()
        };

        let report = run_simulator(config);

        StressTestReport {
            resources,
            iterations,
            violations: report.violations.len(),
            success: report.passed(),
        }
    }
}

/// Report from a stress test run
#[derive(Debug, Clone)]
pub struct StressTestReport {
    pub resources: usize,
    pub iterations: usize,
    pub violations: usize,
    pub success: bool,
}
