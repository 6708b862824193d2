//! `terrastat-analysis`: statistics over reconciled tables.
//!
//! Pure computation on `terrastat_core::Table`. Results are serde-serializable
//! and collected into a nested [`Report`].

pub mod correlation;
pub mod describe;
pub mod error;
pub mod report;

pub use correlation::{correlation_test, pearson, CorrelationOutcome, CorrelationResult, DEFAULT_SIGNIFICANCE};
pub use describe::{describe, ColumnStatistics, StatisticsResult};
pub use error::AnalysisError;
pub use report::{Report, ReportNode, Section};
