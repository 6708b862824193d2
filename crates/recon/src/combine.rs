//! Join/Rollup Engine: combines reconciled tables and reduces them to the
//! granularity an analysis needs.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use terrastat_core::{KeyValue, Outcome, Table, Value, Warnings};

use crate::error::ReconError;

fn require(table: &Table, column: &str) -> Result<usize, ReconError> {
    table.column_index(column).ok_or_else(|| ReconError::missing_column(column))
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Every left row survives; unmatched ones get missing right values.
    #[default]
    Left,
    /// Only rows with a match on both sides.
    Inner,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Inner => write!(f, "inner"),
        }
    }
}

/// Join `left` and `right` on equal values of `on`.
///
/// Output columns: all of `left`, then the non-key columns of `right`. A
/// non-key name present on both sides becomes `name_x` / `name_y`. Missing
/// keys never match. Duplicate keys fan out to every combination, in left
/// order then right order.
pub fn join(left: &Table, right: &Table, on: &str, how: JoinKind) -> Result<Outcome<Table>, ReconError> {
    const OP: &str = "join";
    let l_key = require(left, on)?;
    let r_key = require(right, on)?;

    let right_columns: Vec<usize> = (0..right.width()).filter(|&i| i != r_key).collect();
    let shared: HashSet<&str> = right_columns
        .iter()
        .map(|&i| right.columns()[i].as_str())
        .filter(|c| *c != on && left.has_column(c))
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| if shared.contains(c.as_str()) { format!("{c}_x") } else { c.clone() })
        .collect();
    columns.extend(right_columns.iter().map(|&i| {
        let c = &right.columns()[i];
        if shared.contains(c.as_str()) {
            format!("{c}_y")
        } else {
            c.clone()
        }
    }));

    let mut index: HashMap<KeyValue, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(key) = row[r_key].key() {
            index.entry(key).or_default().push(i);
        }
    }

    let mut rows = Vec::new();
    let mut unmatched = 0usize;
    for l_row in left.rows() {
        let matches = l_row[l_key].key().and_then(|k| index.get(&k));
        match matches {
            Some(found) => {
                for &m in found {
                    let r_row = &right.rows()[m];
                    let mut row = l_row.clone();
                    row.extend(right_columns.iter().map(|&i| r_row[i].clone()));
                    rows.push(row);
                }
            }
            None => {
                unmatched += 1;
                if how == JoinKind::Left {
                    let mut row = l_row.clone();
                    row.resize(columns.len(), Value::Missing);
                    rows.push(row);
                }
            }
        }
    }

    let mut warnings = Warnings::new();
    if unmatched > 0 {
        let fate = match how {
            JoinKind::Left => "kept with missing right values",
            JoinKind::Inner => "dropped",
        };
        warnings.info(OP, format!("{unmatched} left row(s) without a match on '{on}' {fate}"));
    }
    let table = Table::from_rows(columns, rows)?;
    Ok(warnings.finish(table))
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Numeric sum; missing values skipped, an all-missing group sums to 0.
    Sum,
    /// First non-missing value in row order.
    First,
    /// Number of non-missing values.
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnReduction {
    pub column: String,
    pub reduction: Reduction,
    /// Output column name; defaults to `column`.
    #[serde(default)]
    pub name: Option<String>,
}

impl ColumnReduction {
    pub fn new(column: impl Into<String>, reduction: Reduction) -> Self {
        Self { column: column.into(), reduction, name: None }
    }

    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.column)
    }
}

/// Group on all of `group_columns` jointly and reduce each listed column.
///
/// One row per group, ordered by group key; group columns first, then one
/// column per reduction.
pub fn rollup<S: AsRef<str>>(
    table: &Table,
    group_columns: &[S],
    reductions: &[ColumnReduction],
) -> Result<Outcome<Table>, ReconError> {
    const OP: &str = "rollup";
    let group_idx = group_columns
        .iter()
        .map(|c| require(table, c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let reduce_idx = reductions
        .iter()
        .map(|r| require(table, &r.column))
        .collect::<Result<Vec<_>, _>>()?;

    let mut warnings = Warnings::new();
    let mut groups: BTreeMap<Vec<KeyValue>, (Vec<Value>, Vec<Value>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in table.rows() {
        let Some(key) = group_idx.iter().map(|&i| row[i].key()).collect::<Option<Vec<_>>>() else {
            dropped += 1;
            continue;
        };
        let (_, acc) = groups.entry(key).or_insert_with(|| {
            let head = group_idx.iter().map(|&i| row[i].clone()).collect();
            let init = reductions
                .iter()
                .map(|r| match r.reduction {
                    Reduction::Sum => Value::Missing,
                    Reduction::First => Value::Missing,
                    Reduction::Count => Value::Int(0),
                })
                .collect();
            (head, init)
        });

        for ((slot, r), &i) in acc.iter_mut().zip(reductions).zip(&reduce_idx) {
            let v = &row[i];
            match r.reduction {
                Reduction::Sum => {
                    *slot = slot.checked_add(v).ok_or_else(|| ReconError::NonNumericValue {
                        column: r.column.clone(),
                        value: v.render(),
                    })?;
                }
                Reduction::First => {
                    if slot.is_missing() && !v.is_missing() {
                        *slot = v.clone();
                    }
                }
                Reduction::Count => {
                    if !v.is_missing() {
                        *slot = Value::Int(slot.as_i64().unwrap_or(0) + 1);
                    }
                }
            }
        }
    }

    if dropped > 0 {
        warnings.warn(OP, format!("dropped {dropped} row(s) with a missing group value"));
    }

    let mut columns: Vec<String> = group_columns.iter().map(|c| c.as_ref().to_string()).collect();
    columns.extend(reductions.iter().map(|r| r.output_name().to_string()));

    let rows = groups
        .into_values()
        .map(|(mut head, acc)| {
            head.extend(acc.into_iter().zip(reductions).map(|(v, r)| match (r.reduction, v) {
                (Reduction::Sum, Value::Missing) => Value::Int(0),
                (_, v) => v,
            }));
            head
        })
        .collect();

    let table = Table::from_rows(columns, rows)?;
    warnings.info(OP, format!("{} group(s)", table.len()));
    Ok(warnings.finish(table))
}

// ---------------------------------------------------------------------------
// Value counts, membership, projection
// ---------------------------------------------------------------------------

/// One row per distinct non-missing value of `column` with its count, most
/// frequent first; ties keep first-appearance order.
pub fn count_by(table: &Table, column: &str, count_column: &str) -> Result<Outcome<Table>, ReconError> {
    const OP: &str = "count_by";
    let idx = require(table, column)?;

    let mut order: Vec<(KeyValue, Value)> = Vec::new();
    let mut counts: HashMap<KeyValue, i64> = HashMap::new();
    let mut missing = 0usize;
    for row in table.rows() {
        let Some(key) = row[idx].key() else {
            missing += 1;
            continue;
        };
        let n = counts.entry(key.clone()).or_insert(0);
        if *n == 0 {
            order.push((key, row[idx].clone()));
        }
        *n += 1;
    }

    let mut rows: Vec<(i64, Vec<Value>)> = order
        .into_iter()
        .map(|(key, value)| {
            let n = counts.get(&key).copied().unwrap_or(0);
            (n, vec![value, Value::Int(n)])
        })
        .collect();
    // stable: equal counts stay in first-appearance order
    rows.sort_by(|a, b| b.0.cmp(&a.0));

    let mut warnings = Warnings::new();
    if missing > 0 {
        warnings.info(OP, format!("{missing} missing value(s) in '{column}' not counted"));
    }
    let table = Table::from_rows([column, count_column], rows.into_iter().map(|(_, r)| r).collect())?;
    Ok(warnings.finish(table))
}

/// Keep the rows whose `column` value occurs in `other.other_column`.
pub fn filter_by_membership(
    table: &Table,
    column: &str,
    other: &Table,
    other_column: &str,
) -> Result<Outcome<Table>, ReconError> {
    const OP: &str = "filter_by_membership";
    let idx = require(table, column)?;
    let other_idx = require(other, other_column)?;

    let allowed: HashSet<Option<KeyValue>> = other.rows().iter().map(|r| r[other_idx].key()).collect();
    let out = table.filter_rows(|r| allowed.contains(&r[idx].key()));

    let mut warnings = Warnings::new();
    warnings.info(
        OP,
        format!("kept {} of {} row(s) found in '{other_column}'", out.len(), table.len()),
    );
    Ok(warnings.finish(out))
}

/// Projection onto `columns`, in the given order.
pub fn select_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Table, ReconError> {
    for c in columns {
        require(table, c.as_ref())?;
    }
    Ok(table.select(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastat_core::Severity;

    fn fires() -> Table {
        Table::from_rows(
            ["TERYT", "Gmina", "Pożary"],
            vec![
                vec![Value::Int(201011), "Bolesławiec".into(), Value::Int(12)],
                vec![Value::Int(201022), "Bolesławiec".into(), Value::Int(7)],
                vec![Value::Int(201032), "Gromadka".into(), Value::Int(3)],
                vec![Value::Missing, "Nieznana".into(), Value::Int(1)],
            ],
        )
        .unwrap()
    }

    fn areas() -> Table {
        Table::from_rows(
            ["TERYT", "Gmina", "Powierzchnia"],
            vec![
                vec![Value::Int(201022), "Bolesławiec".into(), Value::Float(288.4)],
                vec![Value::Int(201011), "Bolesławiec".into(), Value::Float(23.6)],
                vec![Value::Missing, "Nieznana".into(), Value::Float(1.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn left_join_keeps_unmatched_and_suffixes_collisions() {
        let out = join(&fires(), &areas(), "TERYT", JoinKind::Left).unwrap().value;
        assert_eq!(out.columns(), &["TERYT", "Gmina_x", "Pożary", "Gmina_y", "Powierzchnia"]);
        assert_eq!(out.len(), 4);
        assert_eq!(out.get(0, "Powierzchnia"), Some(&Value::Float(23.6)));
        assert_eq!(out.get(1, "Powierzchnia"), Some(&Value::Float(288.4)));
        assert_eq!(out.get(2, "Powierzchnia"), Some(&Value::Missing));
        // missing keys never match
        assert_eq!(out.get(3, "Gmina_y"), Some(&Value::Missing));
    }

    #[test]
    fn inner_join_drops_unmatched() {
        let out = join(&fires(), &areas(), "TERYT", JoinKind::Inner).unwrap().value;
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn join_fans_out_duplicate_keys() {
        let left = Table::from_rows(["k", "a"], vec![vec!["x".into(), Value::Int(1)], vec!["x".into(), Value::Int(2)]])
            .unwrap();
        let right = Table::from_rows(["k", "b"], vec![vec!["x".into(), Value::Int(10)], vec!["x".into(), Value::Int(20)]])
            .unwrap();
        let out = join(&left, &right, "k", JoinKind::Inner).unwrap().value;
        let pairs: Vec<(i64, i64)> = out
            .rows()
            .iter()
            .map(|r| (r[1].as_i64().unwrap(), r[2].as_i64().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(1, 10), (1, 20), (2, 10), (2, 20)]);
    }

    #[test]
    fn join_absent_key_is_configuration_error() {
        let err = join(&fires(), &areas(), "KOD", JoinKind::Left).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
    }

    #[test]
    fn rollup_sums_and_orders_by_group_key() {
        let t = Table::from_rows(
            ["Powiat", "Województwo", "Ludność", "Gmina"],
            vec![
                vec!["wrocławski".into(), "dolnośląskie".into(), Value::Int(100), "Kobierzyce".into()],
                vec!["bolesławiecki".into(), "dolnośląskie".into(), Value::Int(40), "Gromadka".into()],
                vec!["wrocławski".into(), "dolnośląskie".into(), Value::Missing, Value::Missing],
                vec!["wrocławski".into(), "dolnośląskie".into(), Value::Int(50), "Siechnice".into()],
                vec![Value::Missing, "dolnośląskie".into(), Value::Int(9), "?".into()],
            ],
        )
        .unwrap();
        let out = rollup(
            &t,
            &["Powiat", "Województwo"],
            &[
                ColumnReduction::new("Ludność", Reduction::Sum),
                ColumnReduction::new("Gmina", Reduction::First),
                ColumnReduction { name: Some("Gminy".into()), ..ColumnReduction::new("Gmina", Reduction::Count) },
            ],
        )
        .unwrap();
        assert!(out.has_warnings());
        let t = out.value;
        assert_eq!(t.columns(), &["Powiat", "Województwo", "Ludność", "Gmina", "Gminy"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.row(0).unwrap()[0], Value::from("bolesławiecki"));
        assert_eq!(t.get(1, "Ludność"), Some(&Value::Int(150)));
        assert_eq!(t.get(1, "Gmina"), Some(&Value::from("Kobierzyce")));
        assert_eq!(t.get(1, "Gminy"), Some(&Value::Int(2)));
    }

    #[test]
    fn rollup_rejects_text_sum() {
        let t = Table::from_rows(["g", "v"], vec![vec!["a".into(), "12".into()]]).unwrap();
        let err = rollup(&t, &["g"], &[ColumnReduction::new("v", Reduction::Sum)]).unwrap_err();
        assert!(matches!(err, ReconError::NonNumericValue { .. }));
    }

    #[test]
    fn count_by_orders_by_frequency_then_appearance() {
        let t = Table::from_rows(
            ["Gmina"],
            vec![
                vec!["Osiek".into()],
                vec!["Bełchatów".into()],
                vec!["Gromadka".into()],
                vec!["Bełchatów".into()],
                vec![Value::Missing],
            ],
        )
        .unwrap();
        let out = count_by(&t, "Gmina", "count").unwrap();
        assert!(out.warnings.iter().all(|w| w.severity == Severity::Info));
        let names: Vec<String> = out.value.column("Gmina").unwrap().map(|v| v.render()).collect();
        assert_eq!(names, vec!["Bełchatów", "Osiek", "Gromadka"]);
        assert_eq!(out.value.get(0, "count"), Some(&Value::Int(2)));
    }

    #[test]
    fn membership_filter_keeps_listed_values() {
        let names = Table::from_rows(["Gmina"], vec![vec!["Gromadka".into()]]).unwrap();
        let out = filter_by_membership(&fires(), "Gmina", &names, "Gmina").unwrap().value;
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0, "Pożary"), Some(&Value::Int(3)));
    }

    #[test]
    fn select_columns_projects_in_order() {
        let out = select_columns(&fires(), &["Pożary", "TERYT"]).unwrap();
        assert_eq!(out.columns(), &["Pożary", "TERYT"]);
        assert!(matches!(
            select_columns(&fires(), &["Ludność"]).unwrap_err(),
            ReconError::MissingColumn { .. }
        ));
    }
}
