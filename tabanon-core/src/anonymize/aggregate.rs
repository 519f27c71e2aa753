//! Partition aggregation.
//!
//! Every quasi-identifier value in a partition is replaced by a single
//! representative value, so records in the same partition become
//! indistinguishable on their quasi-identifiers. The sensitive column and
//! all other columns are left untouched.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Result, TabAnonError};
use crate::models::{Dataset, Value, ValueKey};

use super::column::{CategoricalColumn, NumericColumn, QiColumn};
use super::config::{CategoricalAggregation, QuasiIdentifier};
use super::models::Partition;

/// Separator between distinct values in a generalized categorical label.
pub const GENERALIZED_SEPARATOR: &str = "|";

/// Returns a new dataset with each partition's quasi-identifiers aggregated.
///
/// - numeric: the partition mean; a constant partition keeps its value
/// - categorical: per `policy`
///
/// A quasi-identifier that is also the sensitive column is skipped.
/// Records covered by no partition keep their original values. Applying the
/// aggregation twice yields the same dataset as applying it once.
pub fn aggregate(
    dataset: &Dataset,
    partitions: &[Partition],
    quasi_identifiers: &[QuasiIdentifier],
    sensitive_column: Option<&str>,
    policy: CategoricalAggregation,
) -> Result<Dataset> {
    check_records(dataset, partitions)?;

    let mut output = dataset.clone();

    for qi in quasi_identifiers {
        if sensitive_column == Some(qi.name.as_str()) {
            continue;
        }

        let column = QiColumn::bind(dataset, qi)?;
        let Some(target) = output.column_mut(&qi.name) else {
            continue;
        };

        for partition in partitions.iter().filter(|p| !p.is_empty()) {
            let value = match column {
                QiColumn::Numeric(ref c) => numeric_representative(c, partition),
                QiColumn::Categorical(ref c) => categorical_representative(c, partition, policy),
            };
            for id in partition.iter() {
                target.values[id] = value.clone();
            }
        }
    }

    Ok(output)
}

fn check_records(dataset: &Dataset, partitions: &[Partition]) -> Result<()> {
    let len = dataset.len();
    for partition in partitions {
        if let Some(id) = partition.iter().find(|&id| id >= len) {
            return Err(TabAnonError::invalid_dataset(format!(
                "partition references record {} but the dataset has {} records",
                id, len
            )));
        }
    }
    Ok(())
}

fn numeric_representative(column: &NumericColumn<'_>, partition: &Partition) -> Value {
    let values = column.values_of(partition.records());
    let Some(&first) = values.first() else {
        return Value::Null;
    };

    if values.iter().all(|&v| v == first) {
        return Value::Number(first);
    }

    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = if sum.is_finite() {
        sum / count
    } else {
        // The sum overflowed; scaling each term first keeps it in range.
        values.iter().map(|v| v / count).sum()
    };
    Value::Number(mean)
}

fn categorical_representative(
    column: &CategoricalColumn<'_>,
    partition: &Partition,
    policy: CategoricalAggregation,
) -> Value {
    match policy {
        CategoricalAggregation::Generalize => generalize(column, partition),
        CategoricalAggregation::MostFrequent => most_frequent(column, partition),
    }
}

fn generalize(column: &CategoricalColumn<'_>, partition: &Partition) -> Value {
    let distinct: BTreeSet<ValueKey<'_>> = partition.iter().map(|id| column.value(id)).collect();

    if distinct.len() == 1
        && let Some(only) = distinct.first()
    {
        return only.to_value();
    }

    let label = distinct
        .iter()
        .map(ValueKey::to_string)
        .collect::<Vec<_>>()
        .join(GENERALIZED_SEPARATOR);
    Value::Text(label)
}

fn most_frequent(column: &CategoricalColumn<'_>, partition: &Partition) -> Value {
    let mut counts: HashMap<ValueKey<'_>, usize> = HashMap::new();
    for id in partition.iter() {
        *counts.entry(column.value(id)).or_insert(0) += 1;
    }

    // Ties go to the value seen first.
    let mut best: Option<(ValueKey<'_>, usize)> = None;
    for key in column.distinct_in_order(partition.records()) {
        let count = counts.get(&key).copied().unwrap_or(0);
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((key, count));
        }
    }

    best.map_or(Value::Null, |(key, _)| key.to_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::numeric("age", [20.0, 30.0, 40.0, 50.0]),
            Column::text("zip", ["130", "148", "130", "130"]),
            Column::text("disease", ["flu", "cold", "flu", "flu"]),
            Column::text("name", ["ann", "bob", "cy", "dee"]),
        ])
        .unwrap()
    }

    fn qis() -> Vec<QuasiIdentifier> {
        vec![
            QuasiIdentifier::numeric("age"),
            QuasiIdentifier::categorical("zip"),
        ]
    }

    fn partitions() -> Vec<Partition> {
        vec![Partition::new(vec![0, 1]), Partition::new(vec![2, 3])]
    }

    #[test]
    fn test_numeric_mean() {
        let dataset = dataset();
        let output = aggregate(
            &dataset,
            &partitions(),
            &qis(),
            Some("disease"),
            CategoricalAggregation::default(),
        )
        .unwrap();

        let ages = &output.column("age").unwrap().values;
        assert_eq!(
            ages,
            &vec![
                Value::Number(25.0),
                Value::Number(25.0),
                Value::Number(45.0),
                Value::Number(45.0)
            ]
        );
    }

    #[test]
    fn test_numeric_mean_near_f64_max_stays_finite() {
        let half = f64::MAX / 2.0;
        let dataset = Dataset::new(vec![Column::numeric("x", [f64::MAX, half])]).unwrap();
        let output = aggregate(
            &dataset,
            &[Partition::full(2)],
            &[QuasiIdentifier::numeric("x")],
            None,
            CategoricalAggregation::default(),
        )
        .unwrap();

        let mean = output.value(0, "x").and_then(Value::as_f64).unwrap();
        assert_eq!(mean, f64::MAX / 2.0 + half / 2.0);
        assert_eq!(output.value(1, "x"), output.value(0, "x"));
        assert!(output.to_rows()[0]["x"].is_f64());
    }

    #[test]
    fn test_categorical_generalize() {
        let dataset = dataset();
        let output = aggregate(
            &dataset,
            &partitions(),
            &qis(),
            Some("disease"),
            CategoricalAggregation::Generalize,
        )
        .unwrap();

        assert_eq!(output.value(0, "zip"), Some(&Value::from("130|148")));
        assert_eq!(output.value(1, "zip"), Some(&Value::from("130|148")));
        // Single distinct value is kept as-is.
        assert_eq!(output.value(2, "zip"), Some(&Value::from("130")));
    }

    #[test]
    fn test_categorical_most_frequent_ties_first_seen() {
        let dataset = dataset();
        let output = aggregate(
            &dataset,
            &[Partition::new(vec![1, 0]), Partition::new(vec![2, 3])],
            &qis(),
            None,
            CategoricalAggregation::MostFrequent,
        )
        .unwrap();

        // 148 and 130 tie in [1, 0]; 148 appears first.
        assert_eq!(output.value(0, "zip"), Some(&Value::from("148")));
        assert_eq!(output.value(3, "zip"), Some(&Value::from("130")));
    }

    #[test]
    fn test_other_columns_untouched() {
        let dataset = dataset();
        let output = aggregate(
            &dataset,
            &partitions(),
            &qis(),
            Some("disease"),
            CategoricalAggregation::default(),
        )
        .unwrap();

        assert_eq!(output.column("disease"), dataset.column("disease"));
        assert_eq!(output.column("name"), dataset.column("name"));
        // Input is not modified.
        assert_eq!(dataset.value(0, "age"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn test_sensitive_quasi_identifier_is_skipped() {
        let dataset = dataset();
        let qis = vec![QuasiIdentifier::categorical("disease")];
        let output = aggregate(
            &dataset,
            &[Partition::full(4)],
            &qis,
            Some("disease"),
            CategoricalAggregation::default(),
        )
        .unwrap();

        assert_eq!(output, dataset);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let dataset = Dataset::new(vec![
            Column::numeric("x", [0.1, 0.2, 0.7, 1.0, 1.0, 1.0]),
            Column::text("c", ["a", "b", "c", "a", "a", "d"]),
        ])
        .unwrap();
        let qis = vec![
            QuasiIdentifier::numeric("x"),
            QuasiIdentifier::categorical("c"),
        ];
        let partitions = vec![Partition::new(vec![0, 1, 2]), Partition::new(vec![3, 4, 5])];

        for policy in [CategoricalAggregation::Generalize, CategoricalAggregation::MostFrequent] {
            let once = aggregate(&dataset, &partitions, &qis, None, policy).unwrap();
            let twice = aggregate(&once, &partitions, &qis, None, policy).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_out_of_range_record_rejected() {
        let dataset = dataset();
        let err = aggregate(
            &dataset,
            &[Partition::new(vec![0, 9])],
            &qis(),
            None,
            CategoricalAggregation::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TabAnonError::InvalidDataset { .. }));
    }

    #[test]
    fn test_empty_dataset() {
        let dataset =
            Dataset::new(vec![Column::numeric("age", []), Column::text("zip", [])]).unwrap();
        let output =
            aggregate(&dataset, &[], &qis(), None, CategoricalAggregation::default()).unwrap();
        assert!(output.is_empty());
        assert_eq!(output.column_names(), vec!["age", "zip"]);
    }
}
