use std::collections::HashMap;

use terrastat_analysis::{correlation_test, describe, Report, ReportNode};
use terrastat_core::{Outcome, Table, Warnings};

use crate::aggregate::{collapse_boroughs, BoroughColumns};
use crate::combine;
use crate::config::{AnalysisConfig, RunConfig};
use crate::error::ReconError;
use crate::filter::{self, detect_code_format, SuffixRule};
use crate::merge::{drop_units, merge_units, MergeOverride};
use crate::model::{Diagnostic, RunInput, RunMeta, RunResult};
use crate::normalize;
use crate::pipeline::Stage;
use crate::reconcile::{check_key_consistency, find_duplicate_keys};

/// Run the configured stages and analyses over pre-loaded tables.
///
/// Any stage error aborts the run; soft failures end up in
/// `RunResult::warnings`.
pub fn run(config: &RunConfig, input: &RunInput) -> Result<RunResult, ReconError> {
    let pipeline = config.pipeline()?;

    let mut tables = HashMap::new();
    for name in pipeline.sources() {
        let table = input
            .tables
            .get(name)
            .ok_or_else(|| ReconError::UnknownTable(format!("source '{name}' was not loaded")))?;
        tables.insert(name.clone(), table.clone());
    }

    let mut state = RunState { tables, warnings: Warnings::new(), diagnostics: Vec::new() };
    for (index, stage) in pipeline.stages().iter().enumerate() {
        log::info!("stage {index}: {}", stage.op_name());
        state.apply(index, stage).map_err(|e| ReconError::Stage {
            index,
            op: stage.op_name().to_string(),
            source: Box::new(e),
        })?;
    }

    let report = run_analyses(&config.analyses, &state.tables, &mut state.warnings)?;

    log::info!(
        "run '{}' finished: {} stage(s), {} message(s)",
        config.name,
        pipeline.stages().len(),
        state.warnings.len()
    );

    Ok(RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            stages_run: pipeline.stages().len(),
        },
        report,
        diagnostics: state.diagnostics,
        warnings: state.warnings.into_vec(),
        tables: state.tables,
    })
}

// ---------------------------------------------------------------------------
// Stage dispatch
// ---------------------------------------------------------------------------

struct RunState {
    tables: HashMap<String, Table>,
    warnings: Warnings,
    diagnostics: Vec<Diagnostic>,
}

impl RunState {
    fn get(&self, name: &str) -> Result<&Table, ReconError> {
        self.tables
            .get(name)
            .ok_or_else(|| ReconError::UnknownTable(name.to_string()))
    }

    fn put(&mut self, name: &str, outcome: Outcome<Table>) {
        let table = outcome.drain_into(&mut self.warnings);
        self.tables.insert(name.to_string(), table);
    }

    /// Store a row-dropping result and record how many rows went.
    fn put_filtered(&mut self, stage: usize, op: &str, name: &str, outcome: Outcome<Table>) -> Result<(), ReconError> {
        let before = self.get(name)?.len();
        let removed = before.saturating_sub(outcome.value.len());
        self.diagnostics.push(Diagnostic::RowsRemoved {
            stage,
            op: op.to_string(),
            table: name.to_string(),
            removed,
        });
        self.put(name, outcome);
        Ok(())
    }

    fn apply(&mut self, index: usize, stage: &Stage) -> Result<(), ReconError> {
        let op = stage.op_name();
        match stage {
            Stage::StripPrefix { table, column, prefix } => {
                let out = normalize::strip_prefix(self.get(table)?, column, prefix);
                self.put(table, out);
            }
            Stage::ToLowercase { table, column } => {
                let out = normalize::to_lowercase(self.get(table)?, column);
                self.put(table, out);
            }
            Stage::TrimWhitespace { table, column } => {
                let out = normalize::trim_whitespace(self.get(table)?, column);
                self.put(table, out);
            }
            Stage::CoerceToInteger { table, column } => {
                let out = normalize::coerce_to_integer(self.get(table)?, column);
                self.put(table, out);
            }
            Stage::DropTrailingCharacter { table, column } => {
                let out = normalize::drop_trailing_character(self.get(table)?, column);
                self.put(table, out);
            }
            Stage::RenameColumn { table, from, to } => {
                let out = normalize::rename_column(self.get(table)?, from, to);
                self.put(table, out);
            }
            Stage::DropRowsBySuffix { table, column, suffixes } => {
                let out = normalize::drop_rows_by_suffix(self.get(table)?, column, suffixes);
                self.put_filtered(index, op, table, out)?;
            }

            Stage::DropBlankKeys { table, column } => {
                let out = filter::drop_blank_key_rows(self.get(table)?, column).map(|f| f.table);
                self.put_filtered(index, op, table, out)?;
            }
            Stage::DropShortKeys { table, column, min_length } => {
                let out = filter::drop_short_key_rows(self.get(table)?, column, *min_length).map(|f| f.table);
                self.put_filtered(index, op, table, out)?;
            }
            Stage::DropCityDistricts { table, column, format } => {
                self.suffix_rule(index, table, column, *format, SuffixRule::CityDistricts)?;
            }
            Stage::DropSplitMunicipalityHalves { table, column, format } => {
                self.suffix_rule(index, table, column, *format, SuffixRule::SplitMunicipalityHalves)?;
            }

            Stage::CollapseBoroughs { table, value_column, unit_column, region_column } => {
                let columns = BoroughColumns {
                    value_column: value_column.clone(),
                    unit_column: unit_column.clone(),
                    region_column: region_column.clone(),
                };
                let out = collapse_boroughs(self.get(table)?, &columns)?;
                let c = &out.value;
                self.diagnostics.push(Diagnostic::BoroughCollapse {
                    stage: index,
                    table: table.clone(),
                    groups_collapsed: c.groups_collapsed,
                    rows_removed: c.rows_removed,
                    rows_added: c.rows_added,
                });
                self.put(table, out.map(|c| c.table));
            }

            Stage::MergeUnits { table, target, absorbed, value_column, name_column } => {
                let merge = MergeOverride {
                    target: target.clone(),
                    absorbed: absorbed.clone(),
                    value_column: value_column.clone(),
                    name_column: name_column.clone(),
                };
                let out = merge_units(self.get(table)?, &merge);
                self.put(table, out);
            }
            Stage::DropUnits { table, column, values } => {
                let out = drop_units(self.get(table)?, column, values);
                self.put_filtered(index, op, table, out)?;
            }

            Stage::CheckKeys { left, right, column } => {
                let report = check_key_consistency(self.get(left)?, self.get(right)?, column)?;
                if !report.is_consistent() {
                    self.warnings.caution(
                        op,
                        format!(
                            "'{left}' and '{right}' disagree on '{column}': {} left-only, {} right-only row(s)",
                            report.left_unmatched.len(),
                            report.right_unmatched.len()
                        ),
                    );
                }
                self.diagnostics.push(Diagnostic::KeyConsistency {
                    stage: index,
                    left: left.clone(),
                    right: right.clone(),
                    consistent: report.is_consistent(),
                    report,
                });
            }
            Stage::CheckDuplicates { table, column } => {
                let report = find_duplicate_keys(self.get(table)?, column)?;
                if !report.is_empty() {
                    self.warnings.caution(
                        op,
                        format!("{} value(s) repeat in '{table}'.'{column}'", report.groups.len()),
                    );
                }
                self.diagnostics.push(Diagnostic::Duplicates { stage: index, table: table.clone(), report });
            }

            Stage::Join { left, right, on, how, right_columns, output } => {
                let right_table = match right_columns {
                    Some(cols) => combine::select_columns(self.get(right)?, cols)?,
                    None => self.get(right)?.clone(),
                };
                let out = combine::join(self.get(left)?, &right_table, on, *how)?;
                self.put(output, out);
            }
            Stage::Rollup { table, group_by, reductions, output } => {
                let out = combine::rollup(self.get(table)?, group_by, reductions)?;
                self.put(output, out);
            }
            Stage::CountBy { table, column, count_column, output } => {
                let out = combine::count_by(self.get(table)?, column, count_column)?;
                self.put(output, out);
            }
            Stage::FilterByMembership { table, column, other, other_column, output } => {
                let other_column = other_column.as_deref().unwrap_or(column);
                let out = combine::filter_by_membership(self.get(table)?, column, self.get(other)?, other_column)?;
                self.put(output.as_deref().unwrap_or(table), out);
            }
            Stage::SelectColumns { table, columns, output } => {
                let out = combine::select_columns(self.get(table)?, columns)?;
                self.put(output.as_deref().unwrap_or(table), Outcome::clean(out));
            }
        }
        Ok(())
    }

    fn suffix_rule(
        &mut self,
        index: usize,
        table: &str,
        column: &str,
        format: Option<filter::CodeFormat>,
        rule: SuffixRule,
    ) -> Result<(), ReconError> {
        let source = self.get(table)?;
        let format = match format {
            Some(pinned) => pinned,
            None => {
                let detected = detect_code_format(source, column);
                log::info!("{}: '{table}'.'{column}' detected as {detected:?}", rule.op_name());
                self.diagnostics.push(Diagnostic::CodeFormat {
                    stage: index,
                    table: table.to_string(),
                    column: column.to_string(),
                    format: detected,
                });
                detected
            }
        };
        let out = filter::apply_suffix_rule(self.get(table)?, column, format, rule);
        self.put_filtered(index, rule.op_name(), table, out)
    }
}

// ---------------------------------------------------------------------------
// Analyses
// ---------------------------------------------------------------------------

fn run_analyses(
    analyses: &[AnalysisConfig],
    tables: &HashMap<String, Table>,
    warnings: &mut Warnings,
) -> Result<Report, ReconError> {
    let mut report = Report::new();
    for analysis in analyses {
        let table = tables
            .get(analysis.table())
            .ok_or_else(|| ReconError::UnknownTable(analysis.table().to_string()))?;
        let node = match analysis {
            AnalysisConfig::Describe { columns, .. } => {
                ReportNode::Statistics(describe(table, columns).drain_into(warnings))
            }
            AnalysisConfig::Correlation { x, y, significance_level, .. } => {
                ReportNode::Correlation(correlation_test(table, x, y, *significance_level)?)
            }
        };
        report.insert(analysis.path(), node)?;
    }
    Ok(report)
}
