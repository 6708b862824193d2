use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Two columns share a name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    /// A row does not have one value per column.
    #[error("row {row}: expected {expected} value(s), found {found}")]
    RowWidth { row: usize, expected: usize, found: usize },
    /// A referenced column does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}
