use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use terrastat_core::{KeyValue, Outcome, Table, Value, Warnings};

use crate::error::ReconError;

/// Columns used to find and collapse city boroughs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoroughColumns {
    /// Numeric column summed across the boroughs of one city.
    pub value_column: String,
    /// Containing unit name (municipality).
    pub unit_column: String,
    /// Containing region name (county).
    pub region_column: String,
}

/// Result of a borough collapse.
#[derive(Debug, Clone, PartialEq)]
pub struct Collapsed {
    pub table: Table,
    /// Number of cities whose boroughs were merged into one row.
    pub groups_collapsed: usize,
    pub rows_removed: usize,
    pub rows_added: usize,
}

impl Collapsed {
    /// Rows removed minus rows added.
    pub fn net_removed(&self) -> usize {
        self.rows_removed - self.rows_added
    }
}

struct GroupAcc {
    first: Vec<Value>,
    total: Value,
}

/// Collapse rows that record one city as several boroughs.
///
/// A row is a borough when its unit name equals its region name (a city with
/// county rights) and that (unit, region) pair occurs more than once. Each
/// group becomes one row: `value_column` is summed, every other column comes
/// from the first member. Other rows keep their order; collapsed rows are
/// appended after them, ordered by group key.
pub fn collapse_boroughs(table: &Table, columns: &BoroughColumns) -> Result<Outcome<Collapsed>, ReconError> {
    const OP: &str = "collapse_boroughs";
    let value_idx = require(table, &columns.value_column)?;
    let unit_idx = require(table, &columns.unit_column)?;
    let region_idx = require(table, &columns.region_column)?;

    let city_key = |row: &[Value]| -> Option<(KeyValue, KeyValue)> {
        let unit = row[unit_idx].key()?;
        let region = row[region_idx].key()?;
        (unit == region).then_some((unit, region))
    };

    let mut pair_counts: HashMap<(KeyValue, KeyValue), usize> = HashMap::new();
    for row in table.rows() {
        if let Some(key) = city_key(row) {
            *pair_counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut warnings = Warnings::new();
    let mut kept = Vec::new();
    let mut groups: BTreeMap<(KeyValue, KeyValue), GroupAcc> = BTreeMap::new();
    let mut rows_removed = 0usize;

    for row in table.rows() {
        let borough = city_key(row).filter(|k| pair_counts.get(k).copied().unwrap_or(0) > 1);
        let Some(key) = borough else {
            kept.push(row.clone());
            continue;
        };

        rows_removed += 1;
        let acc = groups.entry(key).or_insert_with(|| GroupAcc {
            first: row.clone(),
            total: Value::Missing,
        });
        acc.total = acc.total.checked_add(&row[value_idx]).ok_or_else(|| ReconError::NonNumericValue {
            column: columns.value_column.clone(),
            value: row[value_idx].render(),
        })?;
    }

    if groups.is_empty() {
        warnings.info(OP, "no boroughs found; table unchanged");
        return Ok(warnings.finish(Collapsed {
            table: table.clone(),
            groups_collapsed: 0,
            rows_removed: 0,
            rows_added: 0,
        }));
    }

    warnings.info(OP, format!("found {rows_removed} borough row(s) in {} cit(ies)", groups.len()));

    let groups_collapsed = groups.len();
    for (_, acc) in groups {
        let mut row = acc.first;
        row[value_idx] = match acc.total {
            Value::Missing => Value::Int(0),
            total => total,
        };
        kept.push(row);
    }

    let out = table.with_rows(kept);
    warnings.info(OP, format!("collapsed boroughs; {} row(s) fewer", table.len() - out.len()));
    Ok(warnings.finish(Collapsed {
        table: out,
        groups_collapsed,
        rows_removed,
        rows_added: groups_collapsed,
    }))
}

fn require(table: &Table, column: &str) -> Result<usize, ReconError> {
    table.column_index(column).ok_or_else(|| ReconError::missing_column(column))
}
