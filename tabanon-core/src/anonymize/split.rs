//! Partition splitting.
//!
//! Both strategies return two disjoint partitions whose union is the input,
//! each preserving the input's record order. A side may be empty when the
//! column cannot separate the records; the partitioner rejects such splits.

use std::collections::HashSet;

use super::column::{CategoricalColumn, NumericColumn, QiColumn};
use super::models::Partition;

/// Splits `partition` on `column`.
///
/// - numeric: records strictly below the median go left, the rest right.
/// - categorical: distinct values in order of first appearance; records
///   holding one of the first ⌈n/2⌉ values go left, the rest right.
///
/// # Panics
/// Panics if `partition` holds a record id outside the bound dataset.
pub fn split(column: &QiColumn<'_>, partition: &Partition) -> (Partition, Partition) {
    match column {
        QiColumn::Numeric(c) => split_numeric(c, partition),
        QiColumn::Categorical(c) => split_categorical(c, partition),
    }
}

fn split_numeric(column: &NumericColumn<'_>, partition: &Partition) -> (Partition, Partition) {
    let Some(median) = median(column.values_of(partition.records())) else {
        return (Partition::new(Vec::new()), Partition::new(Vec::new()));
    };

    let (left, right): (Vec<_>, Vec<_>) = partition.iter().partition(|&id| column.value(id) < median);
    (Partition::new(left), Partition::new(right))
}

fn split_categorical(
    column: &CategoricalColumn<'_>,
    partition: &Partition,
) -> (Partition, Partition) {
    let distinct = column.distinct_in_order(partition.records());
    let left_count = distinct.len().div_ceil(2);
    let left_values: HashSet<_> = distinct.into_iter().take(left_count).collect();

    let (left, right): (Vec<_>, Vec<_>) = partition
        .iter()
        .partition(|&id| left_values.contains(&column.value(id)));
    (Partition::new(left), Partition::new(right))
}

/// Median of `values`; the mean of the two middle values for even counts.
pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        // Halving first keeps the midpoint finite near f64::MAX.
        Some(values[mid - 1] / 2.0 + values[mid] / 2.0)
    } else {
        Some(values[mid])
    }
}
