use std::collections::HashSet;

use serde::Serialize;

use crate::error::TableError;
use crate::value::Value;

/// Column type derived from its non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Only integers.
    Integer,
    /// Numbers, at least one of them a float.
    Float,
    /// Only text.
    Text,
    /// Numbers and text.
    Mixed,
    /// No non-missing values at all.
    Empty,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Mixed => write!(f, "mixed"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Rows x named columns. Every row holds exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self, TableError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(TableError::DuplicateColumn(c.clone()));
            }
        }
        Ok(Self { columns, rows: Vec::new() })
    }

    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like `column_index`, but an unknown column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        let mut ints = false;
        let mut floats = false;
        let mut texts = false;
        for v in self.column(name)? {
            match v {
                Value::Missing => {}
                Value::Int(_) => ints = true,
                Value::Float(_) => floats = true,
                Value::Text(_) => texts = true,
            }
        }
        Some(match (ints || floats, texts) {
            (false, false) => ColumnKind::Empty,
            (true, true) => ColumnKind::Mixed,
            (false, true) => ColumnKind::Text,
            (true, false) if floats => ColumnKind::Float,
            (true, false) => ColumnKind::Integer,
        })
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Table {
        Table { columns: self.columns.clone(), rows: Vec::new() }
    }

    /// Same columns, new rows. Rows must match the column count.
    pub fn with_rows(&self, rows: Vec<Vec<Value>>) -> Table {
        debug_assert!(rows.iter().all(|r| r.len() == self.columns.len()));
        Table { columns: self.columns.clone(), rows }
    }

    /// Keep the rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Value]) -> bool) -> Table {
        let rows = self.rows.iter().filter(|r| keep(r)).cloned().collect();
        self.with_rows(rows)
    }

    /// Rewrite every value of column `idx`.
    pub fn map_column(&self, idx: usize, mut f: impl FnMut(&Value) -> Value) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut row = r.clone();
                row[idx] = f(&r[idx]);
                row
            })
            .collect();
        self.with_rows(rows)
    }

    pub fn rename_column(&self, old: &str, new: &str) -> Result<Table, TableError> {
        let idx = self.require_column(old)?;
        if old != new && self.has_column(new) {
            return Err(TableError::DuplicateColumn(new.to_string()));
        }
        let mut columns = self.columns.clone();
        columns[idx] = new.to_string();
        Ok(Table { columns, rows: self.rows.clone() })
    }

    /// Projection onto `names`, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, TableError> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Table::from_rows(names.iter().map(|n| n.as_ref().to_string()), rows)
    }

    /// Positional column window `[start, end)`, clamped to the table width.
    pub fn slice_columns(&self, start: usize, end: usize) -> Table {
        let end = end.min(self.columns.len());
        let start = start.min(end);
        Table {
            columns: self.columns[start..end].to_vec(),
            rows: self.rows.iter().map(|r| r[start..end].to_vec()).collect(),
        }
    }

    /// Drop the first `n` rows.
    pub fn skip_rows(&self, n: usize) -> Table {
        self.with_rows(self.rows.iter().skip(n).cloned().collect())
    }

    /// Replace all column names at once.
    pub fn with_column_names<S: Into<String>>(
        &self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Table, TableError> {
        let named = Table::new(names)?;
        if named.width() != self.width() {
            return Err(TableError::RowWidth {
                row: 0,
                expected: self.width(),
                found: named.width(),
            });
        }
        Ok(Table { columns: named.columns, rows: self.rows.clone() })
    }
}
