// Spreadsheet import (xls, xlsx, xlsm, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use terrastat_core::{Table, Value};

use crate::error::LoadError;
use crate::header_names;

/// Load one worksheet, the first when `sheet` is `None`.
///
/// Cells keep their absolute column position: a range that starts at column C
/// still yields two leading columns. Leading empty rows are not kept, so the
/// first populated row is the header.
pub fn load(path: &Path, sheet: Option<&str>, skip_rows: usize) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| LoadError::parse(path, e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::parse(path, "workbook contains no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::parse(path, format!("sheet '{sheet_name}': {e}")))?;

    // Range start offset (data may not begin at A1)
    let (_, start_col) = range.start().unwrap_or((0, 0));
    let lead = start_col as usize;

    let mut rows = range.rows().map(|row| {
        let mut values = vec![Value::Missing; lead];
        values.extend(row.iter().map(cell_value));
        values
    });

    let header: Vec<String> = match rows.next() {
        Some(h) => h.iter().map(Value::render).collect(),
        None => Vec::new(),
    };
    let body: Vec<Vec<Value>> = rows.skip(skip_rows).collect();
    let width = body.iter().map(Vec::len).max().unwrap_or(0).max(header.len());

    let body = body
        .into_iter()
        .map(|mut r| {
            r.resize(width, Value::Missing);
            r
        })
        .collect();
    log::info!("{}: sheet '{sheet_name}' has {} column(s)", path.display(), width);
    Table::from_rows(header_names(header, width), body).map_err(|e| LoadError::parse(path, e))
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| LoadError::parse(path, e))?;
    Ok(workbook.sheet_names().to_vec())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::String(s) if s.is_empty() => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => {
            // Integral floats are integers, as published statistics use them
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Value::Int(*n as i64)
            } else {
                Value::Float(*n)
            }
        }
        Data::Int(n) => Value::Int(*n),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // Serial day number, 1900 date system assumed
        Data::DateTime(dt) => Value::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
