#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use must_assert::test_utils::{init_test_logging, init_test_logging_with_level, Fixture};

use must_assert::host::{RunReport, Runner, RunnerConfig};
use must_assert::suites;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;

const PROPTEST_SEED_ENV: &str = "MUST_ASSERT_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Runs a built-in suite on a fresh fixture and returns the report and the
/// captured late-task warnings.
#[must_use]
pub fn run_builtin(name: &str) -> (RunReport, Vec<String>) {
    run_builtin_with(name, &Fixture::new())
}

/// Runs a built-in suite through `fixture`.
#[must_use]
pub fn run_builtin_with(name: &str, fixture: &Fixture) -> (RunReport, Vec<String>) {
    let info = suites::find(name).unwrap_or_else(|| panic!("unknown suite {name}"));
    let report = Runner::new(RunnerConfig::new()).run(info.build(&fixture.plugin));
    (report, fixture.warnings())
}
