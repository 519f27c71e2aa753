//! Typed quasi-identifier column views.
//!
//! Each quasi-identifier is bound once per run to either a numeric or a
//! categorical view. Span, split and aggregation dispatch on the view
//! instead of inspecting cell types on every call.

use crate::error::{Result, TabAnonError};
use crate::models::{Dataset, RecordId, Value, ValueKey};

use super::config::{ColumnKind, QuasiIdentifier};

/// Numeric quasi-identifier: one finite `f64` per record.
#[derive(Debug, Clone)]
pub struct NumericColumn<'a> {
    name: &'a str,
    values: Vec<f64>,
}

impl<'a> NumericColumn<'a> {
    /// Column name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Value of record `id`.
    ///
    /// # Panics
    /// Panics if `id` is outside the bound dataset.
    pub fn value(&self, id: RecordId) -> f64 {
        self.values[id]
    }

    /// Values of the given records, in record order.
    ///
    /// # Panics
    /// Panics if a record id is outside the bound dataset.
    pub fn values_of(&self, records: &[RecordId]) -> Vec<f64> {
        records.iter().map(|&id| self.values[id]).collect()
    }
}

/// Categorical quasi-identifier: one value key per record.
#[derive(Debug, Clone)]
pub struct CategoricalColumn<'a> {
    name: &'a str,
    values: Vec<ValueKey<'a>>,
}

impl<'a> CategoricalColumn<'a> {
    /// Column name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Value of record `id`.
    ///
    /// # Panics
    /// Panics if `id` is outside the bound dataset.
    pub fn value(&self, id: RecordId) -> ValueKey<'a> {
        self.values[id]
    }

    /// Distinct values of the given records, in order of first appearance.
    ///
    /// # Panics
    /// Panics if a record id is outside the bound dataset.
    pub fn distinct_in_order(&self, records: &[RecordId]) -> Vec<ValueKey<'a>> {
        let mut seen = std::collections::HashSet::new();
        records
            .iter()
            .map(|&id| self.values[id])
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

/// A quasi-identifier bound to its data.
#[derive(Debug, Clone)]
pub enum QiColumn<'a> {
    /// Numeric column view
    Numeric(NumericColumn<'a>),
    /// Categorical column view
    Categorical(CategoricalColumn<'a>),
}

impl<'a> QiColumn<'a> {
    /// Binds a quasi-identifier to its column in `dataset`.
    ///
    /// Fails if the column is missing, or if a numeric column holds a value
    /// that is not a finite number.
    pub fn bind(dataset: &'a Dataset, qi: &'a QuasiIdentifier) -> Result<Self> {
        let column = dataset.column(&qi.name).ok_or_else(|| {
            TabAnonError::configuration(format!("unknown quasi-identifier column '{}'", qi.name))
        })?;

        match qi.kind {
            ColumnKind::Numeric => {
                let values = column
                    .values
                    .iter()
                    .enumerate()
                    .map(|(row, value)| {
                        value.as_f64().ok_or_else(|| non_numeric(&qi.name, row, value))
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok(QiColumn::Numeric(NumericColumn {
                    name: &qi.name,
                    values,
                }))
            }
            ColumnKind::Categorical => Ok(QiColumn::Categorical(CategoricalColumn {
                name: &qi.name,
                values: column.values.iter().map(Value::key).collect(),
            })),
        }
    }

    /// Binds every quasi-identifier, preserving configured order.
    pub fn bind_all(dataset: &'a Dataset, qis: &'a [QuasiIdentifier]) -> Result<Vec<Self>> {
        qis.iter().map(|qi| Self::bind(dataset, qi)).collect()
    }

    /// Column name.
    pub fn name(&self) -> &'a str {
        match self {
            QiColumn::Numeric(c) => c.name,
            QiColumn::Categorical(c) => c.name,
        }
    }

    /// Column kind.
    pub fn kind(&self) -> ColumnKind {
        match self {
            QiColumn::Numeric(_) => ColumnKind::Numeric,
            QiColumn::Categorical(_) => ColumnKind::Categorical,
        }
    }
}

fn non_numeric(column: &str, row: usize, value: &Value) -> TabAnonError {
    TabAnonError::configuration(format!(
        "column '{}' is tagged numeric but row {} holds a non-numeric value ({})",
        column,
        row,
        kind_of(value)
    ))
}

// The offending value itself is never echoed; it may be identifying.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "non-finite number",
        Value::Text(_) => "text",
    }
}
