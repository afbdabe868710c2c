//! CLI driver for the cross-implementation accuracy harness (spec §4.7):
//! builds a shared synthetic dataset per geometry, runs the fixed operation
//! suite, and prints a pass/fail table. Exits non-zero if any operation in
//! either geometry's report fails, so this doubles as a CI smoke check.

use std::process::ExitCode;
use std::sync::Arc;

use hyperscatter::accuracy::run_accuracy_harness;
use hyperscatter::dataset::{synth, Geometry};

const CANVAS_WIDTH: u32 = 1200;
const CANVAS_HEIGHT: u32 = 800;
const SEED: u64 = 42;
const LABEL_COUNT: u16 = 10;

fn parse_point_count() -> u32 {
    std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let point_count = parse_point_count();
    let mut all_passed = true;

    for geometry in [Geometry::Euclidean, Geometry::Poincare] {
        let dataset = match synth::generate(point_count, geometry, SEED, LABEL_COUNT) {
            Ok(ds) => Arc::new(ds),
            Err(err) => {
                tracing::error!(?geometry, %err, "dataset generation failed");
                return ExitCode::FAILURE;
            }
        };

        let report = match run_accuracy_harness(geometry, dataset, CANVAS_WIDTH, CANVAS_HEIGHT) {
            Ok(r) => r,
            Err(err) => {
                tracing::error!(?geometry, %err, "accuracy harness failed to run");
                return ExitCode::FAILURE;
            }
        };

        println!("== {:?} ({} points) ==", geometry, point_count);
        for op in &report.operations {
            let status = if op.passed { "PASS" } else { "FAIL" };
            println!(
                "  [{status}] {:<24} max_error={:.3e}{}",
                op.name,
                op.max_error,
                op.detail.as_deref().map(|d| format!("  ({d})")).unwrap_or_default()
            );
        }
        all_passed &= report.passed();
    }

    if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
