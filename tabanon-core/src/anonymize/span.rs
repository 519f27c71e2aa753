//! Span calculation.
//!
//! The span of a column measures how spread out its values are within a
//! partition: the value range for numeric columns and the number of
//! distinct values for categorical ones. The partitioner splits on the
//! widest column first.

use std::collections::HashSet;

use super::column::QiColumn;
use super::models::{Partition, SpanMap};

/// Raw span of one column over a partition.
///
/// Empty partitions have a span of zero.
///
/// # Panics
/// Panics if `partition` holds a record id outside the bound dataset.
pub fn column_span(column: &QiColumn<'_>, partition: &Partition) -> f64 {
    match column {
        QiColumn::Numeric(c) => {
            let mut values = partition.iter().map(|id| c.value(id));
            let Some(first) = values.next() else {
                return 0.0;
            };
            let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
            max - min
        }
        QiColumn::Categorical(c) => {
            let distinct: HashSet<_> = partition.iter().map(|id| c.value(id)).collect();
            distinct.len() as f64
        }
    }
}

/// Computes the span of every quasi-identifier over `partition`.
///
/// With a `scale` (the spans over the whole dataset), each raw span is
/// divided by the column's global span so columns of different magnitude
/// compare fairly. A column with a zero global span normalizes to zero.
///
/// # Panics
/// Panics if `partition` holds a record id outside the bound dataset.
pub fn spans(columns: &[QiColumn<'_>], partition: &Partition, scale: Option<&SpanMap>) -> SpanMap {
    let entries = columns
        .iter()
        .map(|column| {
            let raw = column_span(column, partition);
            let span = match scale.and_then(|s| s.get(column.name())) {
                Some(reference) if reference > 0.0 => raw / reference,
                Some(_) => 0.0,
                None => raw,
            };
            (column.name().to_string(), span)
        })
        .collect();

    SpanMap::new(entries)
}
