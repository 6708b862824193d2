use terrastat_io::{LoadError, WriteError};
use terrastat_recon::ReconError;

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_LOAD, EXIT_PIPELINE, EXIT_USAGE, EXIT_WRITE};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Error while parsing or validating a config.
    pub fn config(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::StageOrder { .. } => {
                Some("cleaning stages run before borough collapse, which runs before merges".to_string())
            }
            ReconError::UnknownTable(_) => Some("tables are named by [[sources]] or a stage's `output`".to_string()),
            _ => None,
        };
        Self { code: EXIT_INVALID_CONFIG, message: err.to_string(), hint }
    }

    /// Error from the engine once the run has started.
    pub fn pipeline(err: ReconError) -> Self {
        Self::new(EXIT_PIPELINE, err.to_string())
    }

    pub fn load(source: &str, err: LoadError) -> Self {
        let hint = match &err {
            LoadError::NotFound(_) => Some("source paths are relative to the config file".to_string()),
            LoadError::UnsupportedFormat { .. } => Some("supported: csv, tsv, txt, xls, xlsx, xlsm, xlsb, ods".to_string()),
            LoadError::ParseFailure { .. } => None,
        };
        Self { code: EXIT_LOAD, message: format!("source '{source}': {err}"), hint }
    }

    pub fn write(err: WriteError) -> Self {
        Self::new(EXIT_WRITE, err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
