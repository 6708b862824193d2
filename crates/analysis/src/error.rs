use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// A column named by a correlation test does not exist.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },
    #[error("significance level must be in (0, 1), got {0}")]
    InvalidSignificance(f64),
    #[error("report path is empty")]
    EmptyPath,
    /// The path runs into an existing result, or a result already sits there.
    #[error("report path '{path}' conflicts with an existing entry")]
    PathConflict { path: String },
}
