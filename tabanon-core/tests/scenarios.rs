//! End-to-end anonymization scenarios.
//!
//! This test suite covers:
//! - Numeric clusters at different k
//! - Datasets that already fail the thresholds as a whole
//! - Empty datasets
//! - Mixed numeric and categorical quasi-identifiers
//! - l-diversity and t-closeness cross-checked with the metrics module
//! - Configuration errors raised before partitioning
//! - File round trips through JSON rows

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use serde_json::json;
use tabanon_core::anonymize::{
    AnonymizationConfig, Anonymizer, CategoricalAggregation, MondrianPartitioner, Partition,
    PrivacyThresholds, PrivacyValidator, PrivacyViolation, QuasiIdentifier, RunContext,
};
use tabanon_core::metrics;
use tabanon_core::models::{Column, Dataset, Value};

fn clusters(disease: [&str; 8]) -> Dataset {
    Dataset::new(vec![
        Column::numeric("x", [1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 12.0, 13.0]),
        Column::text("disease", disease),
    ])
    .unwrap()
}

fn numeric_config(k: usize) -> AnonymizationConfig {
    AnonymizationConfig::new(vec![QuasiIdentifier::numeric("x")])
        .with_thresholds(PrivacyThresholds::new(k))
}

fn x_values(dataset: &Dataset) -> Vec<f64> {
    dataset
        .column("x")
        .unwrap()
        .values
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

fn sizes(partitions: &[Partition]) -> Vec<usize> {
    partitions.iter().map(Partition::len).collect()
}

// =============================================================================
// Numeric clusters
// =============================================================================

#[test]
fn test_scenario_two_clusters() {
    let dataset = clusters(["a"; 8]);

    for k in [3, 4] {
        let result = Anonymizer::new(numeric_config(k))
            .anonymize(&dataset, &RunContext::new())
            .unwrap();

        assert_eq!(sizes(&result.partitions), vec![4, 4], "k = {}", k);
        assert_eq!(
            x_values(&result.dataset),
            vec![2.5, 2.5, 2.5, 2.5, 11.5, 11.5, 11.5, 11.5]
        );
    }
}

#[test]
fn test_scenario_k2_splits_clusters_into_pairs() {
    let dataset = clusters(["a"; 8]);

    let result = Anonymizer::new(numeric_config(2))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert_eq!(sizes(&result.partitions), vec![2, 2, 2, 2]);
    assert_eq!(
        x_values(&result.dataset),
        vec![1.5, 1.5, 3.5, 3.5, 10.5, 10.5, 12.5, 12.5]
    );
    assert_eq!(result.report.splits, 3);
}

#[test]
fn test_scenario_k5_keeps_one_partition() {
    let dataset = clusters(["a"; 8]);

    let result = Anonymizer::new(numeric_config(5))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert_eq!(result.partitions, vec![Partition::full(8)]);
    assert_eq!(x_values(&result.dataset), vec![7.0; 8]);
    assert!(result.report.is_compliant());
}

// =============================================================================
// Whole dataset fails the thresholds
// =============================================================================

#[test]
fn test_scenario_single_sensitive_value_keeps_whole_dataset() {
    let dataset = clusters(["flu"; 8]);

    for k in [1, 2, 3] {
        let config = numeric_config(k)
            .with_sensitive_column("disease")
            .with_thresholds(PrivacyThresholds::new(k).with_l(2));

        let result = Anonymizer::new(config)
            .anonymize(&dataset, &RunContext::new())
            .unwrap();

        assert_eq!(result.partitions, vec![Partition::full(8)], "k = {}", k);
        assert_eq!(
            result.report.root_violation,
            Some(PrivacyViolation::LDiversity { distinct: 1, l: 2 })
        );
        assert!(!result.report.is_compliant());
        assert_eq!(result.dataset.column("disease"), dataset.column("disease"));
    }
}

#[test]
fn test_scenario_k_larger_than_dataset() {
    let dataset = clusters(["a"; 8]);

    let result = Anonymizer::new(numeric_config(100))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert_eq!(result.partitions.len(), 1);
    assert!(matches!(
        result.report.root_violation,
        Some(PrivacyViolation::KAnonymity { size: 8, k: 100 })
    ));
}

// =============================================================================
// Empty dataset
// =============================================================================

#[test]
fn test_scenario_empty_dataset() {
    let dataset = Dataset::new(vec![
        Column::numeric("x", Vec::new()),
        Column::text("disease", Vec::new()),
    ])
    .unwrap();
    let config = numeric_config(3)
        .with_sensitive_column("disease")
        .with_thresholds(PrivacyThresholds::new(3).with_l(2).with_t(0.2));

    let result = Anonymizer::new(config.clone())
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert!(result.partitions.is_empty());
    assert!(result.dataset.is_empty());
    assert_eq!(result.dataset.column_names(), vec!["x", "disease"]);

    let outcome = MondrianPartitioner::from_config(&dataset, &config)
        .unwrap()
        .partition(&RunContext::new())
        .unwrap();
    assert!(outcome.finished.is_empty());
}

#[test]
fn test_scenario_empty_rows() {
    let dataset = Dataset::from_json_str("[]").unwrap();

    let result = Anonymizer::new(numeric_config(2))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert!(result.partitions.is_empty());
    assert_eq!(result.dataset.to_json_string_pretty().unwrap(), "[]");
}

// =============================================================================
// Mixed quasi-identifiers
// =============================================================================

fn patients() -> Dataset {
    Dataset::from_rows(&[
        json!({"age": 23, "zip": "13053", "disease": "flu"}),
        json!({"age": 27, "zip": "13068", "disease": "cold"}),
        json!({"age": 25, "zip": "13053", "disease": "cancer"}),
        json!({"age": 29, "zip": "13068", "disease": "flu"}),
        json!({"age": 52, "zip": "14850", "disease": "cold"}),
        json!({"age": 55, "zip": "14853", "disease": "flu"}),
        json!({"age": 58, "zip": "14850", "disease": "cancer"}),
        json!({"age": 61, "zip": "14853", "disease": "cold"}),
        json!({"age": 33, "zip": "13053", "disease": "flu"}),
        json!({"age": 37, "zip": "14850", "disease": "cold"}),
    ])
    .unwrap()
}

fn patient_config() -> AnonymizationConfig {
    AnonymizationConfig::new(vec![
        QuasiIdentifier::numeric("age"),
        QuasiIdentifier::categorical("zip"),
    ])
    .with_sensitive_column("disease")
}

#[test]
fn test_scenario_mixed_columns_meet_k_and_l() {
    let dataset = patients();
    let config = patient_config().with_thresholds(PrivacyThresholds::new(3).with_l(2));

    let result = Anonymizer::new(config)
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert!(result.report.is_compliant());
    assert!(result.partitions.len() > 1);

    let qis = ["age", "zip"];
    assert!(metrics::find_k_anonymity(&result.dataset, &qis).unwrap() >= 3);
    assert!(metrics::find_l_diversity(&result.dataset, &qis, "disease").unwrap() >= 2);

    // Input had no 3-anonymity on its own.
    assert_eq!(metrics::find_k_anonymity(&dataset, &qis).unwrap(), 1);
}

#[test]
fn test_scenario_generalized_labels() {
    let dataset = patients();
    let config = patient_config().with_thresholds(PrivacyThresholds::new(5));

    let result = Anonymizer::new(config)
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    for partition in &result.partitions {
        let first = result.dataset.value(partition.records()[0], "zip").unwrap();
        for id in partition.iter() {
            assert_eq!(result.dataset.value(id, "zip"), Some(first));
        }
        if let Value::Text(label) = first {
            let parts: Vec<&str> = label.split('|').collect();
            let mut sorted = parts.clone();
            sorted.sort_unstable();
            assert_eq!(parts, sorted);
        }
    }
}

#[test]
fn test_scenario_most_frequent_keeps_real_values() {
    let dataset = patients();
    let config = patient_config()
        .with_thresholds(PrivacyThresholds::new(5))
        .with_categorical_aggregation(CategoricalAggregation::MostFrequent);

    let result = Anonymizer::new(config)
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    let original: Vec<&Value> = dataset.column("zip").unwrap().values.iter().collect();
    for value in &result.dataset.column("zip").unwrap().values {
        assert!(original.contains(&value));
    }
}

#[test]
fn test_scenario_t_closeness() {
    let dataset = patients();
    let config = patient_config().with_thresholds(PrivacyThresholds::new(2).with_t(0.3));

    let result = Anonymizer::new(config)
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    let measured = metrics::measure(&result.dataset, &["age", "zip"], Some("disease")).unwrap();
    assert!(measured.t_closeness.unwrap() <= 0.3 + 1e-9);

    let validator = PrivacyValidator::for_dataset(
        &dataset,
        PrivacyThresholds::new(2).with_t(0.3),
        Some("disease"),
    )
    .unwrap();
    for partition in &result.partitions {
        assert!(validator.max_distance(partition) <= 0.3);
    }
}

#[test]
fn test_scenario_runs_are_deterministic() {
    let dataset = patients();
    let anonymizer = Anonymizer::new(patient_config().with_thresholds(PrivacyThresholds::new(2)));

    let first = anonymizer.anonymize(&dataset, &RunContext::new()).unwrap();
    let second = anonymizer.anonymize(&dataset, &RunContext::new()).unwrap();

    assert_eq!(first.partitions, second.partitions);
    assert_eq!(first.dataset, second.dataset);
}

#[test]
fn test_scenario_worker_pool_matches_sequential() {
    let dataset = patients();
    let config = patient_config().with_thresholds(PrivacyThresholds::new(2).with_l(2));

    let sequential = Anonymizer::new(config.clone())
        .anonymize(&dataset, &RunContext::new())
        .unwrap();
    let parallel = Anonymizer::new(config.with_workers(4))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();

    assert_eq!(sequential.partitions, parallel.partitions);
    assert_eq!(sequential.dataset, parallel.dataset);
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn test_scenario_configuration_errors() {
    let dataset = patients();
    let cases = [
        patient_config().with_thresholds(PrivacyThresholds::new(0)),
        AnonymizationConfig::new(vec![QuasiIdentifier::numeric("height")]),
        patient_config().with_sensitive_column("salary"),
        AnonymizationConfig::new(vec![QuasiIdentifier::numeric("age")])
            .with_thresholds(PrivacyThresholds::new(2).with_l(2)),
        // zip codes are text
        AnonymizationConfig::new(vec![QuasiIdentifier::numeric("zip")]),
    ];

    for config in cases {
        let err = Anonymizer::new(config.clone())
            .anonymize(&dataset, &RunContext::new())
            .unwrap_err();
        assert!(err.is_configuration(), "{:?} -> {}", config, err);
    }
}

// =============================================================================
// File round trip
// =============================================================================

#[test]
fn test_integration_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("patients.json");
    let output = dir.path().join("released.json");

    std::fs::write(&input, patients().to_json_string_pretty().unwrap()).unwrap();

    let dataset = Dataset::from_json_str(&std::fs::read_to_string(&input).unwrap()).unwrap();
    let result = Anonymizer::new(patient_config().with_thresholds(PrivacyThresholds::new(3)))
        .anonymize(&dataset, &RunContext::new())
        .unwrap();
    std::fs::write(&output, result.dataset.to_json_string_pretty().unwrap()).unwrap();

    let released = Dataset::from_json_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(released.column_names(), vec!["age", "zip", "disease"]);
    assert_eq!(released.len(), 10);
    assert!(metrics::find_k_anonymity(&released, &["age", "zip"]).unwrap() >= 3);
}
