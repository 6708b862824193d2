use std::collections::HashMap;

use serde::Serialize;
use terrastat_analysis::Report;
use terrastat_core::{Table, Warning};

use crate::filter::CodeFormat;
use crate::reconcile::{DuplicateReport, KeyConsistencyReport};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded source tables keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub tables: HashMap<String, Table>,
}

impl RunInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), table);
        self
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Structured record of what a stage found, for operators reviewing a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    CodeFormat {
        stage: usize,
        table: String,
        column: String,
        format: CodeFormat,
    },
    RowsRemoved {
        stage: usize,
        op: String,
        table: String,
        removed: usize,
    },
    BoroughCollapse {
        stage: usize,
        table: String,
        groups_collapsed: usize,
        rows_removed: usize,
        rows_added: usize,
    },
    KeyConsistency {
        stage: usize,
        left: String,
        right: String,
        consistent: bool,
        report: KeyConsistencyReport,
    },
    Duplicates {
        stage: usize,
        table: String,
        report: DuplicateReport,
    },
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub stages_run: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub report: Report,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<Warning>,
    /// Final state of every table, sources included.
    #[serde(skip)]
    pub tables: HashMap<String, Table>,
}

impl RunResult {
    /// Entries with `Severity::Warning`.
    pub fn warning_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.severity == terrastat_core::Severity::Warning)
            .count()
    }
}
