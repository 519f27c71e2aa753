//! Tabular data model shared by the anonymizer, the metrics and the
//! pseudonymization utility.
//!
//! Datasets are column-oriented. A record's identity is its row index,
//! which stays stable for the lifetime of a run, so partitions can be
//! expressed as plain lists of row indices.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabAnonError};

/// Stable identity of a record: its row index in the dataset.
pub type RecordId = usize;

/// A single cell value.
///
/// Serialized as the plain JSON scalar (`null`, `true`, `42.5`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Missing or null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Textual value
    Text(String),
}

impl Value {
    /// Returns the numeric value if this is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Returns a borrowed, hashable and totally ordered key for this value.
    pub fn key(&self) -> ValueKey<'_> {
        match self {
            Value::Null => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Number(n) => ValueKey::number(*n),
            Value::Text(s) => ValueKey::Text(s),
        }
    }

    /// Converts a JSON value into a cell value.
    ///
    /// Arrays and objects are kept as their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Value::Text(value.to_string())
            }
        }
    }

    /// Converts this value into JSON. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key().fmt(f)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Borrowed view of a [`Value`] usable as a map key.
///
/// Numbers compare with `f64::total_cmp`, and `-0.0` is folded into `0.0`,
/// so equality, ordering and hashing agree. Variants order as
/// `Null < Bool < Number < Text`.
#[derive(Debug, Clone, Copy)]
pub enum ValueKey<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Textual value
    Text(&'a str),
}

impl<'a> ValueKey<'a> {
    /// Builds a numeric key, folding negative zero.
    pub fn number(value: f64) -> Self {
        if value == 0.0 {
            ValueKey::Number(0.0)
        } else {
            ValueKey::Number(value)
        }
    }

    /// Converts the key back into an owned value.
    pub fn to_value(&self) -> Value {
        match self {
            ValueKey::Null => Value::Null,
            ValueKey::Bool(b) => Value::Bool(*b),
            ValueKey::Number(n) => Value::Number(*n),
            ValueKey::Text(s) => Value::Text((*s).to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ValueKey::Null => 0,
            ValueKey::Bool(_) => 1,
            ValueKey::Number(_) => 2,
            ValueKey::Text(_) => 3,
        }
    }
}

impl PartialEq for ValueKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueKey<'_> {}

impl PartialOrd for ValueKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ValueKey::Null, ValueKey::Null) => Ordering::Equal,
            (ValueKey::Bool(a), ValueKey::Bool(b)) => a.cmp(b),
            (ValueKey::Number(a), ValueKey::Number(b)) => a.total_cmp(b),
            (ValueKey::Text(a), ValueKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for ValueKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            ValueKey::Null => {}
            ValueKey::Bool(b) => b.hash(state),
            ValueKey::Number(n) => n.to_bits().hash(state),
            ValueKey::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for ValueKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKey::Null => write!(f, "null"),
            ValueKey::Bool(b) => write!(f, "{}", b),
            ValueKey::Number(n) => write!(f, "{}", n),
            ValueKey::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named column of cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    /// Creates a new column.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates a numeric column from plain floats.
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Number).collect())
    }

    /// Creates a textual column from string slices.
    pub fn text<'s>(name: impl Into<String>, values: impl IntoIterator<Item = &'s str>) -> Self {
        Self::new(name, values.into_iter().map(Value::from).collect())
    }
}

/// Column-oriented table of records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Creates a dataset from columns of equal length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());

        for column in &columns {
            if column.values.len() != row_count {
                return Err(TabAnonError::invalid_dataset(format!(
                    "column '{}' has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    row_count
                )));
            }
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TabAnonError::invalid_dataset(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        Ok(Self { columns, row_count })
    }

    /// Builds a dataset from JSON rows (an array of objects).
    ///
    /// Columns are ordered by first appearance of their keys; keys missing
    /// from a row become `Null`.
    pub fn from_rows(rows: &[serde_json::Value]) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let obj = row.as_object().ok_or_else(|| {
                TabAnonError::invalid_dataset(format!("row {} is not a JSON object", index))
            })?;
            for key in obj.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).map_or(Value::Null, Value::from_json))
                    .collect();
                Column::new(name, values)
            })
            .collect();

        let mut dataset = Self::new(columns)?;
        dataset.row_count = rows.len();
        Ok(dataset)
    }

    /// Parses a dataset from a JSON array of row objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let rows: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| TabAnonError::serialization("parsing dataset rows", e))?;
        Self::from_rows(&rows)
    }

    /// Converts the dataset back into JSON rows, keeping column order.
    pub fn to_rows(&self) -> Vec<serde_json::Value> {
        (0..self.row_count)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row].to_json()))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect()
    }

    /// Serializes the dataset as a pretty-printed JSON array of rows.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_rows())
            .map_err(|e| TabAnonError::serialization("serializing dataset rows", e))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Returns true if the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Mutable column lookup, used when building derived datasets.
    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns the value of `column` in record `row`.
    pub fn value(&self, row: RecordId, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Identities of every record, in row order.
    pub fn record_ids(&self) -> Vec<RecordId> {
        (0..self.row_count).collect()
    }
}
