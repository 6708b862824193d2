//! Key Normalizer: canonical forms for territorial codes and unit names.
//!
//! Every operation reads a table and returns a new one. A missing column is
//! never an error here; the step is skipped with a warning.

use terrastat_core::{Outcome, Table, Value, Warnings};

/// Column lookup that records a warning instead of failing.
pub(crate) fn locate(table: &Table, column: &str, context: &str, warnings: &mut Warnings) -> Option<usize> {
    let idx = table.column_index(column);
    if idx.is_none() {
        warnings.warn(context, format!("column '{column}' does not exist; step skipped"));
    }
    idx
}

/// Remove a literal leading `prefix` from every text value.
pub fn strip_prefix(table: &Table, column: &str, prefix: &str) -> Outcome<Table> {
    const OP: &str = "strip_prefix";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let mut stripped = 0usize;
    let out = table.map_column(idx, |v| match v {
        Value::Text(s) => match s.strip_prefix(prefix) {
            Some(rest) => {
                stripped += 1;
                Value::Text(rest.to_string())
            }
            None => v.clone(),
        },
        _ => v.clone(),
    });
    warnings.info(OP, format!("removed prefix '{prefix}' from {stripped} value(s) in '{column}'"));
    warnings.finish(out)
}

/// Lowercase every text value.
pub fn to_lowercase(table: &Table, column: &str) -> Outcome<Table> {
    const OP: &str = "to_lowercase";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let out = table.map_column(idx, |v| match v {
        Value::Text(s) => Value::Text(s.to_lowercase()),
        _ => v.clone(),
    });
    warnings.info(OP, format!("lowercased column '{column}'"));
    warnings.finish(out)
}

/// Remove every space and tab, including internal ones.
pub fn trim_whitespace(table: &Table, column: &str) -> Outcome<Table> {
    const OP: &str = "trim_whitespace";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let out = table.map_column(idx, |v| match v {
        Value::Text(s) => Value::Text(s.chars().filter(|c| *c != ' ' && *c != '\t').collect()),
        _ => v.clone(),
    });
    warnings.info(OP, format!("removed spaces and tabs from column '{column}'"));
    warnings.finish(out)
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(|x| Value::Float(x).as_i64()))
        }
        other => other.as_i64(),
    }
}

/// Parse the whole column as integers, or change nothing.
///
/// One unparseable value (missing values included) rejects the whole
/// conversion and the input comes back untouched.
pub fn coerce_to_integer(table: &Table, column: &str) -> Outcome<Table> {
    const OP: &str = "coerce_to_integer";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let mut parsed = Vec::with_capacity(table.len());
    let mut rejected = 0usize;
    let mut first_rejected: Option<(usize, String)> = None;
    for (row, v) in table.rows().iter().map(|r| &r[idx]).enumerate() {
        match parse_integer(v) {
            Some(n) => parsed.push(n),
            None => {
                rejected += 1;
                first_rejected.get_or_insert_with(|| (row, v.render()));
            }
        }
    }

    if let Some((row, raw)) = first_rejected {
        warnings.warn(
            OP,
            format!(
                "column '{column}' has {rejected} value(s) that are not integers \
                 (first at row {row}: '{raw}'); table left unchanged"
            ),
        );
        return warnings.finish(table.clone());
    }

    let mut parsed = parsed.into_iter();
    let out = table.map_column(idx, |_| parsed.next().map(Value::Int).unwrap_or_default());
    warnings.info(OP, format!("converted column '{column}' to integers"));
    warnings.finish(out)
}

/// Cut the last character off the text form of every value.
///
/// The result is text. Missing values stay missing.
pub fn drop_trailing_character(table: &Table, column: &str) -> Outcome<Table> {
    const OP: &str = "drop_trailing_character";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let out = table.map_column(idx, |v| match v {
        Value::Missing => Value::Missing,
        other => {
            let mut s = other.render();
            s.pop();
            Value::Text(s)
        }
    });
    warnings.info(OP, format!("removed the last character in column '{column}'"));
    warnings.finish(out)
}

/// Remove rows whose text form of `column` ends with any of `suffixes`.
///
/// Exact string suffixes, not numeric comparison. Missing values never match
/// and are reported as a caution.
pub fn drop_rows_by_suffix<S: AsRef<str>>(table: &Table, column: &str, suffixes: &[S]) -> Outcome<Table> {
    const OP: &str = "drop_rows_by_suffix";
    let mut warnings = Warnings::new();
    let Some(idx) = locate(table, column, OP, &mut warnings) else {
        return warnings.finish(table.clone());
    };

    let given = suffixes.len();
    let suffixes: Vec<&str> = suffixes.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()).collect();
    if suffixes.len() < given {
        warnings.warn(OP, "empty suffix would match every row; ignored");
    }
    if suffixes.is_empty() {
        warnings.info(OP, "empty suffix set; no rows removed");
        return warnings.finish(table.clone());
    }

    let mut missing = 0usize;
    let out = table.filter_rows(|r| {
        let v = &r[idx];
        if v.is_missing() {
            missing += 1;
            return true;
        }
        let text = v.render();
        !suffixes.iter().any(|s| text.ends_with(s))
    });

    if missing > 0 {
        warnings.caution(OP, format!("{missing} row(s) with missing '{column}' kept"));
    }
    warnings.info(
        OP,
        format!(
            "removed {} row(s) from '{column}' ending in {:?}",
            table.len() - out.len(),
            suffixes
        ),
    );
    warnings.finish(out)
}

/// Rename a column. Absent source or taken target name: skipped with a warning.
pub fn rename_column(table: &Table, from: &str, to: &str) -> Outcome<Table> {
    const OP: &str = "rename_column";
    let mut warnings = Warnings::new();
    if locate(table, from, OP, &mut warnings).is_none() {
        return warnings.finish(table.clone());
    }
    match table.rename_column(from, to) {
        Ok(out) => {
            warnings.info(OP, format!("renamed column '{from}' to '{to}'"));
            warnings.finish(out)
        }
        Err(e) => {
            warnings.warn(OP, format!("cannot rename '{from}' to '{to}': {e}"));
            warnings.finish(table.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use terrastat_core::Severity;

    fn voivodeships() -> Table {
        Table::from_rows(
            ["Województwo", "wartość"],
            vec![
                vec!["WOJ. MAZOWIECKIE".into(), Value::Int(1)],
                vec!["WOJ. MAŁOPOLSKIE".into(), Value::Int(2)],
                vec!["LUBELSKIE".into(), Value::Int(3)],
            ],
        )
        .unwrap()
    }

    fn codes(values: Vec<Value>) -> Table {
        Table::from_rows(["TERYT"], values.into_iter().map(|v| vec![v]).collect()).unwrap()
    }

    #[test]
    fn strip_default_prefix() {
        let out = strip_prefix(&voivodeships(), "Województwo", "WOJ. ");
        let names: Vec<_> = out.value.column("Województwo").unwrap().cloned().collect();
        assert_eq!(
            names,
            vec![Value::from("MAZOWIECKIE"), Value::from("MAŁOPOLSKIE"), Value::from("LUBELSKIE")]
        );
        assert!(!out.has_warnings());
    }

    #[test]
    fn strip_prefix_keeps_inner_spacing() {
        let t = Table::from_rows(
            ["Region"],
            vec![vec!["Region: Pomorze".into()], vec!["Mazowsze".into()]],
        )
        .unwrap();
        let out = strip_prefix(&t, "Region", "Region:");
        assert_eq!(out.value.get(0, "Region"), Some(&Value::from(" Pomorze")));
        assert_eq!(out.value.get(1, "Region"), Some(&Value::from("Mazowsze")));
    }

    #[test]
    fn absent_column_is_a_warning_not_an_error() {
        let t = voivodeships();
        let out = strip_prefix(&t, "Wojewuctwo", "WOJ. ");
        assert_eq!(out.value, t);
        assert!(out.has_warnings());
        assert_eq!(out.warnings[0].severity, Severity::Warning);

        assert_eq!(to_lowercase(&t, "nope").value, t);
        assert_eq!(trim_whitespace(&t, "nope").value, t);
        assert_eq!(drop_trailing_character(&t, "nope").value, t);
        assert_eq!(coerce_to_integer(&t, "nope").value, t);
    }

    #[test]
    fn lowercase_handles_polish_letters() {
        let t = Table::from_rows(
            ["Województwo"],
            vec![vec!["MaŁoPoLsKiE".into()], vec!["ŚLĄSKIE".into()], vec![Value::Int(4)]],
        )
        .unwrap();
        let out = to_lowercase(&t, "Województwo").value;
        assert_eq!(out.get(0, "Województwo"), Some(&Value::from("małopolskie")));
        assert_eq!(out.get(1, "Województwo"), Some(&Value::from("śląskie")));
        assert_eq!(out.get(2, "Województwo"), Some(&Value::Int(4)));
    }

    #[test]
    fn trim_removes_internal_spaces_and_tabs() {
        let out = trim_whitespace(&codes(vec![" 02 01\t011 ".into()]), "TERYT").value;
        assert_eq!(out.get(0, "TERYT"), Some(&Value::from("0201011")));
    }

    #[test]
    fn coerce_all_or_nothing() {
        let good = codes(vec!["020101".into(), " 20216 ".into(), Value::Int(7), Value::Float(8.0)]);
        let out = coerce_to_integer(&good, "TERYT");
        assert!(!out.has_warnings());
        let ints: Vec<_> = out.value.column("TERYT").unwrap().cloned().collect();
        assert_eq!(ints, vec![Value::Int(20101), Value::Int(20216), Value::Int(7), Value::Int(8)]);

        let bad = codes(vec!["020101".into(), "02O101".into(), "020103".into()]);
        let out = coerce_to_integer(&bad, "TERYT");
        assert_eq!(out.value, bad);
        assert!(out.has_warnings());
        assert!(out.warnings[0].message.contains("row 1"));
    }

    #[test]
    fn coerce_rejects_missing_values() {
        let t = codes(vec!["1".into(), Value::Missing]);
        let out = coerce_to_integer(&t, "TERYT");
        assert_eq!(out.value, t);
        assert!(out.has_warnings());
    }

    #[test]
    fn drop_trailing_character_on_text_and_numbers() {
        let t = codes(vec!["0201011".into(), Value::Int(201012), Value::Missing, "".into()]);
        let out = drop_trailing_character(&t, "TERYT").value;
        let vals: Vec<_> = out.column("TERYT").unwrap().cloned().collect();
        assert_eq!(
            vals,
            vec![Value::from("020101"), Value::from("20101"), Value::Missing, Value::from("")]
        );
    }

    #[test]
    fn drop_rows_by_suffix_exact_match() {
        let t = codes(vec!["0201011".into(), "0201018".into(), Value::Int(201019), "0201014".into()]);
        let out = drop_rows_by_suffix(&t, "TERYT", &["8", "9"]).value;
        let vals: Vec<_> = out.column("TERYT").unwrap().cloned().collect();
        assert_eq!(vals, vec![Value::from("0201011"), Value::from("0201014")]);
    }

    #[test]
    fn drop_rows_by_suffix_keeps_missing_with_caution() {
        let t = codes(vec![Value::Missing, "0201018".into()]);
        let out = drop_rows_by_suffix(&t, "TERYT", &["8"]);
        assert_eq!(out.value.len(), 1);
        assert!(out.value.get(0, "TERYT").unwrap().is_missing());
        assert!(out.warnings.iter().any(|w| w.severity == Severity::Caution));
    }

    #[test]
    fn empty_suffix_set_is_a_no_op() {
        let t = codes(vec!["0201011".into(), "0201018".into()]);
        let none: [&str; 0] = [];
        assert_eq!(drop_rows_by_suffix(&t, "TERYT", &none).value, t);
    }

    #[test]
    fn empty_suffix_ignored_with_warning() {
        let t = codes(vec!["0201011".into(), "0201018".into()]);
        let out = drop_rows_by_suffix(&t, "TERYT", &["", "8"]);
        assert_eq!(out.value.len(), 1);
        assert_eq!(out.value.get(0, "TERYT"), Some(&Value::from("0201011")));
        assert!(out.has_warnings());
    }

    #[test]
    fn rename_skips_taken_names() {
        let t = voivodeships();
        let out = rename_column(&t, "wartość", "Województwo");
        assert_eq!(out.value, t);
        assert!(out.has_warnings());

        let out = rename_column(&t, "wartość", "Liczba");
        assert!(out.value.has_column("Liczba"));
    }

    fn text_table(values: Vec<String>) -> Table {
        Table::from_rows(["c"], values.into_iter().map(|s| vec![Value::Text(s)]).collect()).unwrap()
    }

    proptest! {
        #[test]
        fn lowercase_is_idempotent(values in proptest::collection::vec("[a-zA-ZĄĘŁŃÓŚŹŻąęłńóśźż \t]{0,12}", 0..16)) {
            let t = text_table(values);
            let once = to_lowercase(&t, "c").value;
            let twice = to_lowercase(&once, "c").value;
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn trim_is_idempotent(values in proptest::collection::vec("[0-9 \t]{0,12}", 0..16)) {
            let t = text_table(values);
            let once = trim_whitespace(&t, "c").value;
            let twice = trim_whitespace(&once, "c").value;
            prop_assert_eq!(once, twice);
        }
    }
}
