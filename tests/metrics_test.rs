// This test suite covers the metrics summary artifact at its file boundary. The writer
// always emits thirteen columns while the reader only recovers the seven canonical ones,
// so a save/load cycle must reproduce exactly those seven fields and leave the tier
// columns at zero. The tests also check that failed loads and saves collapse to "no
// metrics" / "not saved" without leaving partially filled summaries behind, and that
// combining summaries is plain field-wise addition, hence associative and commutative.

//! Integration tests for the metrics summary file.

use jitarena::metrics::{MetricsError, MetricsSummary, READ_COLUMNS, WRITE_COLUMNS};
use std::fs;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn summary(seed: i64) -> MetricsSummary {
    MetricsSummary {
        successful_compiles: seed,
        successful_tier0_compiles: seed * 2,
        successful_tier1_compiles: seed * 3,
        failing_compiles: seed + 1,
        missing_compiles: seed + 2,
        num_code_bytes: seed * 1000,
        num_diffed_code_bytes: seed * 10,
        num_executed_instructions: seed * 1_000_000_007,
        num_tier0_executed_instructions: seed * 11,
        num_tier1_executed_instructions: seed * 13,
        num_diff_executed_instructions: seed * 17,
        num_tier0_diff_executed_instructions: seed * 19,
        num_tier1_diff_executed_instructions: seed * 23,
    }
}

#[test]
fn test_e2e_save_then_load_canonical_fields() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.csv");

    let saved = MetricsSummary {
        successful_compiles: 10,
        failing_compiles: 1,
        missing_compiles: 0,
        num_code_bytes: 2048,
        num_diffed_code_bytes: 0,
        num_executed_instructions: 500_000,
        num_diff_executed_instructions: 0,
        ..MetricsSummary::default()
    };
    saved.save_to_file(&path).unwrap();

    let loaded = MetricsSummary::load_from_file(&path).unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn test_tier_fields_are_not_recovered() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.csv");

    let saved = summary(5);
    saved.save_to_file(&path).unwrap();
    let loaded = MetricsSummary::load_from_file(&path).unwrap();

    assert_eq!(loaded.successful_compiles, saved.successful_compiles);
    assert_eq!(loaded.failing_compiles, saved.failing_compiles);
    assert_eq!(loaded.missing_compiles, saved.missing_compiles);
    assert_eq!(loaded.num_code_bytes, saved.num_code_bytes);
    assert_eq!(loaded.num_diffed_code_bytes, saved.num_diffed_code_bytes);
    assert_eq!(loaded.num_executed_instructions, saved.num_executed_instructions);
    assert_eq!(loaded.num_diff_executed_instructions, saved.num_diff_executed_instructions);

    assert_eq!(loaded.successful_tier0_compiles, 0);
    assert_eq!(loaded.successful_tier1_compiles, 0);
    assert_eq!(loaded.num_tier0_executed_instructions, 0);
    assert_eq!(loaded.num_tier1_executed_instructions, 0);
    assert_eq!(loaded.num_tier0_diff_executed_instructions, 0);
    assert_eq!(loaded.num_tier1_diff_executed_instructions, 0);
}

#[test]
fn test_written_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.csv");
    summary(1).save_to_file(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], WRITE_COLUMNS.join(","));
    assert_eq!(lines[1].split(',').count(), 13);
    assert!(lines[1].split(',').all(|v| v.parse::<i64>().is_ok()));
}

#[test]
fn test_legacy_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.csv");
    fs::write(&path, format!("{}\n4,0,1,64,8,1000,2\n", READ_COLUMNS.join(","))).unwrap();

    let loaded = MetricsSummary::load_from_file(&path).unwrap();
    assert_eq!(loaded.successful_compiles, 4);
    assert_eq!(loaded.missing_compiles, 1);
    assert_eq!(loaded.num_diff_executed_instructions, 2);
}

#[test]
fn test_failed_load_means_no_prior_metrics() {
    init_logging();
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.csv");
    assert!(matches!(
        MetricsSummary::load_from_file(&missing),
        Err(MetricsError::Io { .. })
    ));
    assert_eq!(MetricsSummary::load_or_default(&missing), None);

    let corrupt = dir.path().join("corrupt.csv");
    fs::write(&corrupt, "Successful compiles\nten\n").unwrap();
    assert_eq!(MetricsSummary::load_or_default(&corrupt), None);
}

#[test]
fn test_failed_save_is_reported() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-such-dir").join("metrics.csv");

    assert!(matches!(summary(1).save_to_file(&path), Err(MetricsError::Io { .. })));
    assert!(!summary(1).save_or_warn(&path));
    assert!(summary(1).save_or_warn(dir.path().join("ok.csv")));
}

#[test]
fn test_combine_is_associative_and_commutative() {
    let (a, b, c) = (summary(1), summary(7), summary(-3));

    let left = a.combine(&b).combine(&c);
    let right = a.combine(&b.combine(&c));
    let swapped = b.combine(&a.combine(&c));

    assert_eq!(left, right);
    assert_eq!(left, swapped);
    assert_eq!(left.num_executed_instructions, 5 * 1_000_000_007);
}

#[test]
fn test_aggregate_across_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.csv");

    let mut total = MetricsSummary::load_or_default(&path).unwrap_or_default();
    for run in 1..=3 {
        total += &MetricsSummary {
            successful_compiles: run,
            num_executed_instructions: 3_000_000_000,
            ..MetricsSummary::default()
        };
        assert!(total.save_or_warn(&path));
        total = MetricsSummary::load_or_default(&path).unwrap();
    }

    assert_eq!(total.successful_compiles, 6);
    assert_eq!(total.num_executed_instructions, 9_000_000_000);
}
