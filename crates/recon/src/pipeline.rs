//! Declarative stage list and its build-time validation.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use terrastat_core::Value;

use crate::combine::{ColumnReduction, JoinKind};
use crate::error::ReconError;
use crate::filter::{CodeFormat, TERRITORIAL_CODE_WIDTH};

fn default_min_length() -> usize {
    TERRITORIAL_CODE_WIDTH
}

fn default_count_column() -> String {
    "count".to_string()
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One pipeline step. Stages with a `table` field rewrite that table in
/// place unless they name an `output`; `join`, `rollup` and `count_by` always
/// write a new table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Stage {
    // Key Normalizer
    StripPrefix { table: String, column: String, prefix: String },
    ToLowercase { table: String, column: String },
    TrimWhitespace { table: String, column: String },
    CoerceToInteger { table: String, column: String },
    DropTrailingCharacter { table: String, column: String },
    DropRowsBySuffix { table: String, column: String, suffixes: Vec<String> },
    RenameColumn { table: String, from: String, to: String },

    // Row Filter
    DropBlankKeys { table: String, column: String },
    DropShortKeys {
        table: String,
        column: String,
        #[serde(default = "default_min_length")]
        min_length: usize,
    },
    /// `format` pins the code format; otherwise it is detected when the
    /// stage runs.
    DropCityDistricts {
        table: String,
        column: String,
        #[serde(default)]
        format: Option<CodeFormat>,
    },
    DropSplitMunicipalityHalves {
        table: String,
        column: String,
        #[serde(default)]
        format: Option<CodeFormat>,
    },

    // Aggregator
    CollapseBoroughs {
        table: String,
        value_column: String,
        unit_column: String,
        region_column: String,
    },

    // Manual Merge Engine
    MergeUnits {
        table: String,
        target: Value,
        absorbed: Value,
        value_column: String,
        name_column: String,
    },
    DropUnits { table: String, column: String, values: Vec<Value> },

    // Reconciler (read only)
    CheckKeys { left: String, right: String, column: String },
    CheckDuplicates { table: String, column: String },

    // Join/Rollup Engine
    Join {
        left: String,
        right: String,
        on: String,
        #[serde(default)]
        how: JoinKind,
        /// Projection applied to `right` before joining; must include `on`.
        #[serde(default)]
        right_columns: Option<Vec<String>>,
        output: String,
    },
    Rollup {
        table: String,
        group_by: Vec<String>,
        reductions: Vec<ColumnReduction>,
        output: String,
    },
    CountBy {
        table: String,
        column: String,
        #[serde(default = "default_count_column")]
        count_column: String,
        output: String,
    },
    FilterByMembership {
        table: String,
        column: String,
        other: String,
        /// Defaults to `column`.
        #[serde(default)]
        other_column: Option<String>,
        #[serde(default)]
        output: Option<String>,
    },
    SelectColumns {
        table: String,
        columns: Vec<String>,
        #[serde(default)]
        output: Option<String>,
    },
}

/// Cleaning phases whose relative order is enforced per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Normalize,
    Filter,
    Aggregate,
    Merge,
    /// Diagnostics and combinators; never ordered against the others.
    Combine,
}

impl Phase {
    /// Position in the Filter -> Aggregate -> Merge chain.
    fn rank(&self) -> Option<u8> {
        match self {
            Phase::Filter => Some(0),
            Phase::Aggregate => Some(1),
            Phase::Merge => Some(2),
            Phase::Normalize | Phase::Combine => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normalize => write!(f, "normalize"),
            Self::Filter => write!(f, "filter"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Merge => write!(f, "merge"),
            Self::Combine => write!(f, "combine"),
        }
    }
}

impl Stage {
    pub fn op_name(&self) -> &'static str {
        match self {
            Stage::StripPrefix { .. } => "strip_prefix",
            Stage::ToLowercase { .. } => "to_lowercase",
            Stage::TrimWhitespace { .. } => "trim_whitespace",
            Stage::CoerceToInteger { .. } => "coerce_to_integer",
            Stage::DropTrailingCharacter { .. } => "drop_trailing_character",
            Stage::DropRowsBySuffix { .. } => "drop_rows_by_suffix",
            Stage::RenameColumn { .. } => "rename_column",
            Stage::DropBlankKeys { .. } => "drop_blank_keys",
            Stage::DropShortKeys { .. } => "drop_short_keys",
            Stage::DropCityDistricts { .. } => "drop_city_districts",
            Stage::DropSplitMunicipalityHalves { .. } => "drop_split_municipality_halves",
            Stage::CollapseBoroughs { .. } => "collapse_boroughs",
            Stage::MergeUnits { .. } => "merge_units",
            Stage::DropUnits { .. } => "drop_units",
            Stage::CheckKeys { .. } => "check_keys",
            Stage::CheckDuplicates { .. } => "check_duplicates",
            Stage::Join { .. } => "join",
            Stage::Rollup { .. } => "rollup",
            Stage::CountBy { .. } => "count_by",
            Stage::FilterByMembership { .. } => "filter_by_membership",
            Stage::SelectColumns { .. } => "select_columns",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Stage::StripPrefix { .. }
            | Stage::ToLowercase { .. }
            | Stage::TrimWhitespace { .. }
            | Stage::CoerceToInteger { .. }
            | Stage::DropTrailingCharacter { .. }
            | Stage::RenameColumn { .. } => Phase::Normalize,
            Stage::DropRowsBySuffix { .. }
            | Stage::DropBlankKeys { .. }
            | Stage::DropShortKeys { .. }
            | Stage::DropCityDistricts { .. }
            | Stage::DropSplitMunicipalityHalves { .. } => Phase::Filter,
            Stage::CollapseBoroughs { .. } => Phase::Aggregate,
            Stage::MergeUnits { .. } | Stage::DropUnits { .. } => Phase::Merge,
            Stage::CheckKeys { .. }
            | Stage::CheckDuplicates { .. }
            | Stage::Join { .. }
            | Stage::Rollup { .. }
            | Stage::CountBy { .. }
            | Stage::FilterByMembership { .. }
            | Stage::SelectColumns { .. } => Phase::Combine,
        }
    }

    /// Tables this stage reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Stage::CheckKeys { left, right, .. } | Stage::Join { left, right, .. } => vec![left.as_str(), right.as_str()],
            Stage::FilterByMembership { table, other, .. } => vec![table.as_str(), other.as_str()],
            Stage::StripPrefix { table, .. }
            | Stage::ToLowercase { table, .. }
            | Stage::TrimWhitespace { table, .. }
            | Stage::CoerceToInteger { table, .. }
            | Stage::DropTrailingCharacter { table, .. }
            | Stage::DropRowsBySuffix { table, .. }
            | Stage::RenameColumn { table, .. }
            | Stage::DropBlankKeys { table, .. }
            | Stage::DropShortKeys { table, .. }
            | Stage::DropCityDistricts { table, .. }
            | Stage::DropSplitMunicipalityHalves { table, .. }
            | Stage::CollapseBoroughs { table, .. }
            | Stage::MergeUnits { table, .. }
            | Stage::DropUnits { table, .. }
            | Stage::CheckDuplicates { table, .. }
            | Stage::Rollup { table, .. }
            | Stage::CountBy { table, .. }
            | Stage::SelectColumns { table, .. } => vec![table.as_str()],
        }
    }

    /// Table this stage writes, `None` for read-only diagnostics.
    pub fn output(&self) -> Option<&str> {
        match self {
            Stage::CheckKeys { .. } | Stage::CheckDuplicates { .. } => None,
            Stage::Join { output, .. } | Stage::Rollup { output, .. } | Stage::CountBy { output, .. } => {
                Some(output.as_str())
            }
            Stage::FilterByMembership { table, output, .. } | Stage::SelectColumns { table, output, .. } => {
                Some(output.as_deref().unwrap_or(table))
            }
            other => other.inputs().first().copied(),
        }
    }

    fn check_arguments(&self) -> Result<(), String> {
        match self {
            Stage::Rollup { group_by, .. } if group_by.is_empty() => Err("group_by must not be empty".into()),
            Stage::SelectColumns { columns, .. } if columns.is_empty() => Err("columns must not be empty".into()),
            Stage::DropRowsBySuffix { suffixes, .. } if suffixes.iter().any(String::is_empty) => {
                Err("suffixes must not contain an empty string".into())
            }
            Stage::Join { on, right_columns: Some(cols), .. } if !cols.contains(on) => {
                Err(format!("right_columns must include the join key '{on}'"))
            }
            Stage::RenameColumn { to, .. } | Stage::CountBy { count_column: to, .. } if to.is_empty() => {
                Err("column name must not be empty".into())
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A validated, ordered stage list.
#[derive(Debug, Clone)]
pub struct Pipeline {
    sources: Vec<String>,
    stages: Vec<Stage>,
    tables: HashSet<String>,
}

impl Pipeline {
    /// Validate `stages` against the declared `sources`.
    ///
    /// Every table a stage reads must be a source or an earlier stage's
    /// output. Per table, Filter stages must precede Aggregate stages, which
    /// must precede Merge stages. Writing a fresh table (join, rollup,
    /// value counts, projection into a new name) starts a new history.
    pub fn new<S: Into<String>>(sources: impl IntoIterator<Item = S>, stages: Vec<Stage>) -> Result<Self, ReconError> {
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        let mut tables: HashSet<String> = sources.iter().cloned().collect();
        let mut latest: HashMap<String, Phase> = HashMap::new();

        for (index, stage) in stages.iter().enumerate() {
            stage.check_arguments().map_err(|msg| {
                ReconError::ConfigValidation(format!("stage {index} ({}): {msg}", stage.op_name()))
            })?;

            for input in stage.inputs() {
                if !tables.contains(input) {
                    return Err(ReconError::UnknownTable(format!(
                        "stage {index} ({}) reads '{input}' before it exists",
                        stage.op_name()
                    )));
                }
            }

            let Some(output) = stage.output() else { continue };
            let phase = stage.phase();
            let in_place = stage.inputs().first() == Some(&output);

            if !in_place {
                latest.remove(output);
            }
            if let Some(rank) = phase.rank() {
                if let Some(prev) = latest.get(output) {
                    if prev.rank().is_some_and(|p| p > rank) {
                        return Err(ReconError::StageOrder {
                            index,
                            op: stage.op_name().to_string(),
                            table: output.to_string(),
                            after: prev.to_string(),
                        });
                    }
                }
                latest.insert(output.to_string(), phase);
            }
            tables.insert(output.to_string());
        }

        Ok(Self { sources, stages, tables })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether a source or stage produces `table`.
    pub fn produces(&self, table: &str) -> bool {
        self.tables.contains(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(toml_src: &str) -> Stage {
        toml::from_str(toml_src).unwrap()
    }

    fn blank(table: &str) -> Stage {
        Stage::DropBlankKeys { table: table.into(), column: "TERYT".into() }
    }

    fn collapse(table: &str) -> Stage {
        Stage::CollapseBoroughs {
            table: table.into(),
            value_column: "Pożary".into(),
            unit_column: "Gmina".into(),
            region_column: "Powiat".into(),
        }
    }

    fn drop_units(table: &str) -> Stage {
        Stage::DropUnits { table: table.into(), column: "Gmina".into(), values: vec!["Warszawa".into()] }
    }

    #[test]
    fn parses_tagged_stages() {
        let s = stage(
            r#"
op = "merge_units"
table = "fires"
target = 200209
absorbed = 200216
value_column = "Pożary"
name_column = "TERYT"
"#,
        );
        assert_eq!(s.op_name(), "merge_units");
        assert_eq!(s.phase(), Phase::Merge);
        let Stage::MergeUnits { target, .. } = s else { panic!("wrong variant") };
        assert_eq!(target, Value::Int(200209));

        let s = stage("op = \"drop_short_keys\"\ntable = \"t\"\ncolumn = \"TERYT\"\n");
        assert_eq!(s, Stage::DropShortKeys { table: "t".into(), column: "TERYT".into(), min_length: 7 });

        let s = stage("op = \"drop_city_districts\"\ntable = \"t\"\ncolumn = \"TERYT\"\nformat = \"unpadded\"\n");
        assert!(matches!(s, Stage::DropCityDistricts { format: Some(CodeFormat::Unpadded), .. }));
    }

    #[test]
    fn rejects_unknown_op_and_fields() {
        assert!(toml::from_str::<Stage>("op = \"explode\"\ntable = \"t\"\n").is_err());
        assert!(toml::from_str::<Stage>("op = \"to_lowercase\"\ntable = \"t\"\ncolumn = \"c\"\ncolour = 1\n").is_err());
    }

    #[test]
    fn inputs_and_outputs() {
        let join = stage("op = \"join\"\nleft = \"a\"\nright = \"b\"\non = \"k\"\noutput = \"ab\"\n");
        assert_eq!(join.inputs(), vec!["a", "b"]);
        assert_eq!(join.output(), Some("ab"));

        let check = stage("op = \"check_keys\"\nleft = \"a\"\nright = \"b\"\ncolumn = \"k\"\n");
        assert_eq!(check.output(), None);
        assert_eq!(blank("a").output(), Some("a"));
    }

    #[test]
    fn accepts_canonical_order() {
        let p = Pipeline::new(["fires"], vec![blank("fires"), collapse("fires"), drop_units("fires")]).unwrap();
        assert_eq!(p.stages().len(), 3);
        assert!(p.produces("fires"));
        assert!(!p.produces("areas"));
    }

    #[test]
    fn filter_after_aggregate_is_rejected() {
        let err = Pipeline::new(["fires"], vec![collapse("fires"), blank("fires")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "stage 1 (drop_blank_keys) on table 'fires' cannot follow a 'aggregate' stage"
        );
    }

    #[test]
    fn aggregate_after_merge_is_rejected_even_with_normalize_between() {
        let lower = Stage::ToLowercase { table: "fires".into(), column: "Gmina".into() };
        let err = Pipeline::new(["fires"], vec![drop_units("fires"), lower, collapse("fires")]).unwrap_err();
        assert!(matches!(err, ReconError::StageOrder { index: 2, .. }));
    }

    #[test]
    fn ordering_is_per_table() {
        Pipeline::new(["fires", "areas"], vec![drop_units("fires"), blank("areas"), collapse("areas")]).unwrap();
    }

    #[test]
    fn new_table_starts_fresh_history() {
        let join = stage("op = \"join\"\nleft = \"fires\"\nright = \"areas\"\non = \"TERYT\"\noutput = \"all\"\n");
        Pipeline::new(["fires", "areas"], vec![drop_units("fires"), join, blank("all")]).unwrap();
    }

    #[test]
    fn unknown_table_is_rejected() {
        let err = Pipeline::new(["fires"], vec![blank("areas")]).unwrap_err();
        assert!(matches!(err, ReconError::UnknownTable(_)));

        // a stage cannot read what a later stage produces
        let join = stage("op = \"join\"\nleft = \"fires\"\nright = \"fires\"\non = \"TERYT\"\noutput = \"all\"\n");
        assert!(Pipeline::new(["fires"], vec![blank("all"), join]).is_err());
    }

    #[test]
    fn argument_checks() {
        let bad = stage("op = \"join\"\nleft = \"a\"\nright = \"a\"\non = \"k\"\nright_columns = [\"x\"]\noutput = \"o\"\n");
        assert!(matches!(Pipeline::new(["a"], vec![bad]).unwrap_err(), ReconError::ConfigValidation(_)));
    }

    #[test]
    fn empty_suffix_is_invalid() {
        let bad = stage("op = \"drop_rows_by_suffix\"\ntable = \"fires\"\ncolumn = \"TERYT\"\nsuffixes = [\"8\", \"\"]\n");
        let err = Pipeline::new(["fires"], vec![bad]).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(ref msg) if msg.contains("drop_rows_by_suffix")));

        let ok = stage("op = \"drop_rows_by_suffix\"\ntable = \"fires\"\ncolumn = \"TERYT\"\nsuffixes = [\"8\", \"9\"]\n");
        assert!(Pipeline::new(["fires"], vec![ok]).is_ok());
    }
}
