//! `terrastat-core`: tabular container shared by every pipeline stage.
//!
//! A `Table` is rows x named columns with per-cell `Value`s. Stages never
//! mutate a table in place; they build a new one and report soft failures
//! through `Outcome`.

pub mod error;
pub mod outcome;
pub mod table;
pub mod value;

pub use error::TableError;
pub use outcome::{Outcome, Severity, Warning, Warnings};
pub use table::{ColumnKind, Table};
pub use value::{KeyValue, Value};
