//! Column pseudonymization.
//!
//! Each distinct value of a column is replaced by the SHA-256 hex digest of
//! its textual form. The mapping from original values to pseudonyms is
//! returned alongside the new dataset so the substitution can be reversed
//! by whoever holds the mapping. Null values are left as null.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, TabAnonError};
use crate::models::{Dataset, Value, ValueKey};

/// One original value and its pseudonym.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudonymEntry {
    /// Original cell value
    pub original: Value,
    /// SHA-256 hex digest of the original's textual form
    pub pseudonym: String,
}

/// Original values and their pseudonyms, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PseudonymMapping {
    entries: Vec<PseudonymEntry>,
}

impl PseudonymMapping {
    /// Pseudonym assigned to `original`, if it occurred in the column.
    pub fn pseudonym_for(&self, original: &Value) -> Option<&str> {
        let key = original.key();
        self.entries
            .iter()
            .find(|e| e.original.key() == key)
            .map(|e| e.pseudonym.as_str())
    }

    /// Original value behind `pseudonym`.
    pub fn original_for(&self, pseudonym: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.pseudonym == pseudonym)
            .map(|e| &e.original)
    }

    /// Iterates over the mapping entries.
    pub fn iter(&self) -> impl Iterator<Item = &PseudonymEntry> + '_ {
        self.entries.iter()
    }

    /// Number of distinct pseudonymized values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was pseudonymized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the mapping as pretty-printed JSON.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TabAnonError::serialization("serializing pseudonym mapping", e))
    }
}

/// SHA-256 hex digest of a value's textual form.
pub fn pseudonym(value: &Value) -> String {
    format!("{:x}", Sha256::digest(value.to_string().as_bytes()))
}

/// Returns a copy of `dataset` with `column` pseudonymized, and the mapping.
pub fn pseudonymize_column(
    dataset: &Dataset,
    column: &str,
) -> Result<(Dataset, PseudonymMapping)> {
    let source = dataset
        .column(column)
        .ok_or_else(|| TabAnonError::configuration(format!("unknown column '{}'", column)))?;

    let mut assigned: HashMap<ValueKey<'_>, String> = HashMap::new();
    let mut mapping = PseudonymMapping::default();
    let mut replaced = Vec::with_capacity(source.values.len());

    for value in &source.values {
        if matches!(value, Value::Null) {
            replaced.push(Value::Null);
            continue;
        }

        let pseudonym = assigned
            .entry(value.key())
            .or_insert_with(|| {
                let digest = pseudonym(value);
                mapping.entries.push(PseudonymEntry {
                    original: value.clone(),
                    pseudonym: digest.clone(),
                });
                digest
            })
            .clone();
        replaced.push(Value::Text(pseudonym));
    }

    let mut output = dataset.clone();
    if let Some(target) = output.column_mut(column) {
        target.values = replaced;
    }

    debug!(
        "Pseudonymized column '{}': {} distinct values",
        column,
        mapping.len()
    );
    Ok((output, mapping))
}
