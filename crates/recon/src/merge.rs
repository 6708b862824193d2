//! Manual Merge Engine: operator corrections for structural changes that
//! cannot be detected from the data (a municipality split off between two
//! publication dates, a row that must not be counted).

use serde::{Deserialize, Serialize};
use terrastat_core::{Outcome, Table, Value, Warnings};

use crate::normalize::locate;

/// "Unit `target` absorbs unit `absorbed`", summing `value_column`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MergeOverride {
    pub target: Value,
    pub absorbed: Value,
    pub value_column: String,
    pub name_column: String,
}

/// Add the absorbed unit's value to the target and drop the absorbed row.
///
/// Uses the first row for each name. Anything that prevents the merge (a name
/// not found, a missing column, a non-numeric value) leaves the table
/// unchanged and records a warning; it never aborts the run.
pub fn merge_units(table: &Table, merge: &MergeOverride) -> Outcome<Table> {
    const OP: &str = "merge_units";
    let mut warnings = Warnings::new();
    let (Some(name_idx), Some(value_idx)) = (
        locate(table, &merge.name_column, OP, &mut warnings),
        locate(table, &merge.value_column, OP, &mut warnings),
    ) else {
        return warnings.finish(table.clone());
    };

    let positions = |name: &Value| -> Vec<usize> {
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, r)| r[name_idx] == *name)
            .map(|(i, _)| i)
            .collect()
    };
    let target_rows = positions(&merge.target);
    let absorbed_rows = positions(&merge.absorbed);

    let (Some(&target_at), Some(&absorbed_at)) = (target_rows.first(), absorbed_rows.first()) else {
        warnings.warn(
            OP,
            format!(
                "unit '{}' or '{}' not found in '{}'; table unchanged",
                merge.target, merge.absorbed, merge.name_column
            ),
        );
        return warnings.finish(table.clone());
    };

    if target_at == absorbed_at {
        warnings.warn(OP, format!("unit '{}' cannot absorb itself; table unchanged", merge.target));
        return warnings.finish(table.clone());
    }

    for (name, count) in [(&merge.target, target_rows.len()), (&merge.absorbed, absorbed_rows.len())] {
        if count > 1 {
            warnings.caution(OP, format!("{count} rows named '{name}'; using the first"));
        }
    }

    let rows = table.rows();
    let added = &rows[absorbed_at][value_idx];
    let Some(total) = rows[target_at][value_idx].checked_add(added) else {
        warnings.warn(
            OP,
            format!(
                "cannot add '{}' to '{}' in '{}'; table unchanged",
                added, rows[target_at][value_idx], merge.value_column
            ),
        );
        return warnings.finish(table.clone());
    };

    let merged: Vec<Vec<Value>> = rows
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != absorbed_at)
        .map(|(i, r)| {
            let mut row = r.clone();
            if i == target_at {
                row[value_idx] = total.clone();
            }
            row
        })
        .collect();

    warnings.info(
        OP,
        format!(
            "merged '{}' into '{}'; added {} to '{}'",
            merge.absorbed, merge.target, added, merge.value_column
        ),
    );
    warnings.finish(table.with_rows(merged))
}

/// Remove every row whose `column` equals one of `values`.
///
/// A listed value that matches nothing is a warning: the override list no
/// longer fits the data.
pub fn drop_units(table: &Table, column: &str, values: &[Value]) -> Outcome<Table> {
    const OP: &str = "drop_units";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let mut hits = vec![0usize; values.len()];
    let out = table.filter_rows(|r| match values.iter().position(|v| *v == r[idx]) {
        Some(at) => {
            hits[at] += 1;
            false
        }
        None => true,
    });

    for (value, count) in values.iter().zip(&hits) {
        if *count == 0 {
            warnings.warn(OP, format!("no row with '{column}' = '{value}'"));
        }
    }
    warnings.info(OP, format!("removed {} row(s)", table.len() - out.len()));
    warnings.finish(out)
}
