//! `terrastat-recon`: normalization, reconciliation and aggregation of
//! tables keyed by territorial codes.
//!
//! Pure engine crate: receives pre-loaded tables, returns transformed tables,
//! diagnostics and an analysis report. No CLI or IO dependencies.

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;

pub use config::{AnalysisConfig, RunConfig, SourceConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{Diagnostic, RunInput, RunResult};
pub use pipeline::{Pipeline, Stage};
