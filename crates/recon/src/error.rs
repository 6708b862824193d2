use terrastat_analysis::AnalysisError;
use terrastat_core::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad path, empty suffix set, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A stage or analysis refers to a table nothing has produced yet.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// A cleaning stage is declared after a stage it must precede.
    #[error("stage {index} ({op}) on table '{table}' cannot follow a '{after}' stage")]
    StageOrder { index: usize, op: String, table: String, after: String },
    /// Required column absent; the operation cannot proceed.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },
    /// A value that has to be summed is not a number.
    #[error("column '{column}': cannot sum non-numeric value '{value}'")]
    NonNumericValue { column: String, value: String },
    /// Failure inside a numbered pipeline stage.
    #[error("stage {index} ({op}): {source}")]
    Stage {
        index: usize,
        op: String,
        #[source]
        source: Box<ReconError>,
    },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ReconError {
    pub fn missing_column(column: &str) -> Self {
        Self::MissingColumn { column: column.to_string() }
    }
}
