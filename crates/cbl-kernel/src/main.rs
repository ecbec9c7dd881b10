use std::sync::Arc;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};

use cbl_kernel::seed::sample_resources;
use cbl_kernel::session::DigestVerifier;
use cbl_kernel::test_harness::{
    run_simulator, run_simulator_on, SimulatorConfig, TestHarness, SIM_OPERATOR_SECRET,
};
use cbl_kernel::{LedgerConfig, LedgerHandle};
use cbl_store::FileBackend;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Command::new("cbl-kernel")
        .version("0.1.0")
        .about("Capacity-Bounded Ledger kernel")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the ledger simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .help("Run against a file backend rooted here instead of memory"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Run stress test")
                .arg(
                    Arg::new("resources")
                        .long("resources")
                        .default_value("100")
                        .value_parser(value_parser!(usize))
                        .help("Catalog size cap"),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .default_value("50000")
                        .value_parser(value_parser!(usize))
                        .help("Number of operations"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let operations = *args.get_one::<u64>("operations").expect("has default");
            let seed = *args.get_one::<u64>("seed").expect("has default");
            let stop_on_violation = args.get_flag("stop-on-violation");

            let config = SimulatorConfig {
                seed,
                total_operations: operations,
                stop_on_first_violation: stop_on_violation,
                ..Default::default()
            };

            println!("Running ledger simulator...");
            println!("Operations: {operations}");
            println!("Seed: {seed}");
            println!();

            let report = match args.get_one::<String>("data-dir") {
                Some(dir) => {
                    let backend = FileBackend::open(dir)
                        .with_context(|| format!("opening file backend at {dir}"))?;
                    let ledger = LedgerHandle::open(
                        LedgerConfig {
                            seed_resources: sample_resources(),
                            duplicate_guard: config.duplicate_guard,
                            operator_verifier: Arc::new(DigestVerifier::from_secret(
                                SIM_OPERATOR_SECRET,
                            )),
                        },
                        Arc::new(backend),
                    );
                    run_simulator_on(&ledger, config)
                }
                None => run_simulator(config),
            };

            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("stress", args)) => {
            let resources = *args.get_one::<usize>("resources").expect("has default");
            let iterations = *args.get_one::<usize>("iterations").expect("has default");

            println!("Running stress test...");
            println!("Resources: {resources}");
            println!("Iterations: {iterations}");
            println!();

            let report = TestHarness::run_stress_test(resources, iterations);

            println!("Stress Test Report:");
            println!("  Resources: {}", report.resources);
            println!("  Iterations: {}", report.iterations);
            println!("  Violations: {}", report.violations);
            println!("  Success: {}", report.success);

            std::process::exit(if report.success { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
