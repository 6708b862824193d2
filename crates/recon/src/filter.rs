//! Row Filter: structural validity tests on the key column, plus the
//! territorial-code suffix rules.

use serde::{Deserialize, Serialize};
use terrastat_core::{Outcome, Table, Warnings};

use crate::normalize::{drop_rows_by_suffix, locate};

/// Width of a full territorial code: region, sub-region, unit, type digit.
pub const TERRITORIAL_CODE_WIDTH: usize = 7;

/// A filtered table and how many rows it lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub table: Table,
    pub removed: usize,
}

/// Remove rows whose key is missing, empty, or whitespace only.
pub fn drop_blank_key_rows(table: &Table, column: &str) -> Outcome<Filtered> {
    const OP: &str = "drop_blank_keys";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(Filtered { table: table.clone(), removed: 0 });
    };

    let out = table.filter_rows(|r| !r[idx].is_blank());
    let removed = table.len() - out.len();
    warnings.info(OP, format!("removed {removed} row(s) with a blank '{column}'"));
    warnings.finish(Filtered { table: out, removed })
}

/// Remove rows whose text form of `column` has fewer than `min_length`
/// characters. Numbers are measured by their decimal rendering.
pub fn drop_short_key_rows(table: &Table, column: &str, min_length: usize) -> Outcome<Filtered> {
    const OP: &str = "drop_short_keys";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(Filtered { table: table.clone(), removed: 0 });
    };

    let out = table.filter_rows(|r| r[idx].render().chars().count() >= min_length);
    let removed = table.len() - out.len();
    warnings.info(
        OP,
        format!("removed {removed} row(s) with '{column}' shorter than {min_length} character(s)"),
    );
    warnings.finish(Filtered { table: out, removed })
}

// ---------------------------------------------------------------------------
// Code format + suffix rules
// ---------------------------------------------------------------------------

/// How a table stores its territorial codes, inferred once per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFormat {
    /// Seven characters with the leading zero, e.g. `0201011`.
    ZeroPadded,
    /// Six characters: a seven-digit code whose leading zero was lost to
    /// integer conversion, e.g. `201011`.
    Unpadded,
    /// Anything else. Suffix rules do not fire.
    Unrecognized,
}

impl CodeFormat {
    /// Whether the type digit is the last character of the key.
    pub fn has_type_digit(&self) -> bool {
        matches!(self, CodeFormat::ZeroPadded | CodeFormat::Unpadded)
    }
}

/// Infer the code format from the first row of `column`.
///
/// Only the first row is inspected; the whole table is assumed to share its
/// encoding.
pub fn detect_code_format(table: &Table, column: &str) -> CodeFormat {
    let Some(first) = table.row(0) else {
        return CodeFormat::Unrecognized;
    };
    let Some(idx) = table.column_index(column) else {
        return CodeFormat::Unrecognized;
    };
    if first[idx].is_missing() {
        return CodeFormat::Unrecognized;
    }

    let code = first[idx].render();
    let len = code.chars().count();
    match (code.starts_with('0'), len) {
        (true, TERRITORIAL_CODE_WIDTH) => CodeFormat::ZeroPadded,
        (false, 6) => CodeFormat::Unpadded,
        _ => CodeFormat::Unrecognized,
    }
}

/// Fixed meanings of the territorial-code type digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixRule {
    /// `8`, `9`: city districts, already counted in their city.
    CityDistricts,
    /// `4`, `5`: urban and rural halves of an urban-rural municipality.
    SplitMunicipalityHalves,
}

impl SuffixRule {
    pub fn suffixes(&self) -> &'static [&'static str] {
        match self {
            Self::CityDistricts => &["8", "9"],
            Self::SplitMunicipalityHalves => &["4", "5"],
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Self::CityDistricts => "drop_city_districts",
            Self::SplitMunicipalityHalves => "drop_split_municipality_halves",
        }
    }
}

/// Apply `rule` when `format` says the last character is the type digit.
pub fn apply_suffix_rule(table: &Table, column: &str, format: CodeFormat, rule: SuffixRule) -> Outcome<Table> {
    if !format.has_type_digit() {
        let mut warnings = Warnings::new();
        if table.is_empty() {
            warnings.info(rule.op_name(), "table is empty; no rows removed");
        } else if !table.has_column(column) {
            warnings.warn(rule.op_name(), format!("column '{column}' does not exist; step skipped"));
        } else {
            warnings.info(rule.op_name(), format!("'{column}' is not a territorial code; no rows removed"));
        }
        return warnings.finish(table.clone());
    }
    drop_rows_by_suffix(table, column, rule.suffixes())
}

pub fn drop_city_districts(table: &Table, column: &str, format: CodeFormat) -> Outcome<Table> {
    apply_suffix_rule(table, column, format, SuffixRule::CityDistricts)
}

pub fn drop_split_municipality_halves(table: &Table, column: &str, format: CodeFormat) -> Outcome<Table> {
    apply_suffix_rule(table, column, format, SuffixRule::SplitMunicipalityHalves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastat_core::Value;

    fn keyed(values: Vec<Value>) -> Table {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| vec![v, Value::Int(i as i64)])
            .collect();
        Table::from_rows(["TERYT", "n"], rows).unwrap()
    }

    #[test]
    fn blank_keys_removed_and_counted() {
        let t = keyed(vec!["0201011".into(), "".into(), "  \t".into(), Value::Missing, Value::Int(5)]);
        let out = drop_blank_key_rows(&t, "TERYT").value;
        assert_eq!(out.removed, 3);
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table.get(1, "TERYT"), Some(&Value::Int(5)));
    }

    #[test]
    fn blank_keys_absent_column() {
        let t = keyed(vec!["".into()]);
        let out = drop_blank_key_rows(&t, "KOD");
        assert_eq!(out.value.removed, 0);
        assert_eq!(out.value.table, t);
        assert!(out.has_warnings());
    }

    #[test]
    fn short_keys_use_string_length() {
        let t = keyed(vec![
            "0201011".into(),
            "02".into(),
            Value::Int(201011),
            Value::Int(1234567),
            Value::Missing,
        ]);
        let out = drop_short_key_rows(&t, "TERYT", TERRITORIAL_CODE_WIDTH).value;
        assert_eq!(out.removed, 3);
        let kept: Vec<_> = out.table.column("TERYT").unwrap().cloned().collect();
        assert_eq!(kept, vec![Value::from("0201011"), Value::Int(1234567)]);
    }

    #[test]
    fn detect_formats_from_first_row() {
        assert_eq!(detect_code_format(&keyed(vec!["0201011".into()]), "TERYT"), CodeFormat::ZeroPadded);
        assert_eq!(detect_code_format(&keyed(vec![Value::Int(201011)]), "TERYT"), CodeFormat::Unpadded);
        assert_eq!(detect_code_format(&keyed(vec!["1201011".into()]), "TERYT"), CodeFormat::Unrecognized);
        assert_eq!(detect_code_format(&keyed(vec!["020101".into()]), "TERYT"), CodeFormat::Unrecognized);
        assert_eq!(detect_code_format(&keyed(vec![]), "TERYT"), CodeFormat::Unrecognized);
        assert_eq!(detect_code_format(&keyed(vec!["0201011".into()]), "KOD"), CodeFormat::Unrecognized);
        // only the first row counts
        let mixed = keyed(vec!["x".into(), "0201011".into()]);
        assert_eq!(detect_code_format(&mixed, "TERYT"), CodeFormat::Unrecognized);
    }

    #[test]
    fn city_districts_dropped_for_full_codes() {
        let t = keyed(vec!["1465011".into(), "1465028".into(), "1465039".into(), "1465044".into()]);
        let out = drop_city_districts(&t, "TERYT", CodeFormat::ZeroPadded).value;
        assert_eq!(out.len(), 2);

        let out = drop_split_municipality_halves(&t, "TERYT", CodeFormat::ZeroPadded).value;
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn unrecognized_format_leaves_table_alone() {
        let t = keyed(vec!["1465018".into(), "1465029".into()]);
        let format = detect_code_format(&t, "TERYT");
        assert_eq!(format, CodeFormat::Unrecognized);
        let out = drop_city_districts(&t, "TERYT", format);
        assert_eq!(out.value, t);
        assert!(!out.has_warnings());
    }
}
