//! Reconciler: read-only diagnostics comparing key columns.
//!
//! Nothing here changes a table. The reports feed the run diagnostics so an
//! operator can decide which merge overrides to add.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use terrastat_core::{KeyValue, Table, Value};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Key consistency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyConsistencyReport {
    pub key_column: String,
    /// Distinct keys present on both sides.
    pub shared_keys: usize,
    /// Full rows of the left table whose key is absent from the right.
    pub left_unmatched: Table,
    /// Full rows of the right table whose key is absent from the left.
    pub right_unmatched: Table,
}

impl KeyConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.left_unmatched.is_empty() && self.right_unmatched.is_empty()
    }
}

/// Membership key. Missing values compare equal to each other here, so two
/// tables that both have a blank key agree on it.
fn member_key(value: &Value) -> Option<KeyValue> {
    value.key()
}

/// Compare the distinct key sets of two tables.
pub fn check_key_consistency(left: &Table, right: &Table, key_column: &str) -> Result<KeyConsistencyReport, ReconError> {
    let l = left.column_index(key_column).ok_or_else(|| ReconError::missing_column(key_column))?;
    let r = right.column_index(key_column).ok_or_else(|| ReconError::missing_column(key_column))?;

    let left_keys: HashSet<Option<KeyValue>> = left.rows().iter().map(|row| member_key(&row[l])).collect();
    let right_keys: HashSet<Option<KeyValue>> = right.rows().iter().map(|row| member_key(&row[r])).collect();

    let left_unmatched = left.filter_rows(|row| !right_keys.contains(&member_key(&row[l])));
    let right_unmatched = right.filter_rows(|row| !left_keys.contains(&member_key(&row[r])));
    let shared_keys = left_keys.intersection(&right_keys).count();

    if left_unmatched.is_empty() && right_unmatched.is_empty() {
        log::info!("check_keys: '{key_column}' consistent ({shared_keys} shared key(s))");
    } else {
        log::info!(
            "check_keys: '{key_column}' has {} left-only and {} right-only row(s)",
            left_unmatched.len(),
            right_unmatched.len()
        );
    }

    Ok(KeyConsistencyReport {
        key_column: key_column.to_string(),
        shared_keys,
        left_unmatched,
        right_unmatched,
    })
}

// ---------------------------------------------------------------------------
// Duplicate keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub key: Value,
    /// Zero-based row positions in the inspected table.
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub column: String,
    /// One group per repeated value, in order of first appearance.
    pub groups: Vec<DuplicateGroup>,
    /// Every row taking part in a duplicate, in table order.
    pub rows: Table,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Report every row whose `column` value occurs more than once.
pub fn find_duplicate_keys(table: &Table, column: &str) -> Result<DuplicateReport, ReconError> {
    let idx = table.column_index(column).ok_or_else(|| ReconError::missing_column(column))?;

    let mut order: Vec<Option<KeyValue>> = Vec::new();
    let mut positions: HashMap<Option<KeyValue>, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let key = member_key(&row[idx]);
        let entry = positions.entry(key.clone()).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(i);
    }

    let mut groups = Vec::new();
    let mut duplicated = vec![false; table.len()];
    for key in order {
        let Some(rows) = positions.remove(&key) else { continue };
        if rows.len() < 2 {
            continue;
        }
        for &i in &rows {
            duplicated[i] = true;
        }
        let value = key.as_ref().map(KeyValue::to_value).unwrap_or_default();
        groups.push(DuplicateGroup { key: value, rows });
    }

    let mut i = 0;
    let rows = table.filter_rows(|_| {
        let keep = duplicated[i];
        i += 1;
        keep
    });

    if !groups.is_empty() {
        log::info!("check_duplicates: {} repeated value(s) in '{column}'", groups.len());
    }

    Ok(DuplicateReport { column: column.to_string(), groups, rows })
}
