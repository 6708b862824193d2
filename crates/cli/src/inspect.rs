//! `terrastat inspect`: look at one source file before writing a config for it.

use std::path::Path;

use terrastat_core::Table;
use terrastat_io::LoadOptions;

use crate::error::CliError;

pub fn cmd_inspect(file: &Path, sheet: Option<String>, rows: usize) -> Result<Table, CliError> {
    let source = file.display().to_string();

    if terrastat_io::is_spreadsheet(file) {
        let names = terrastat_io::sheet::sheet_names(file).map_err(|e| CliError::load(&source, e))?;
        eprintln!("sheets: {}", names.join(", "));
    }

    let options = LoadOptions { sheet, ..Default::default() };
    let table = terrastat_io::load(file, &options).map_err(|e| CliError::load(&source, e))?;
    print!("{}", render_preview(&table, rows));
    Ok(table)
}

/// Column list with kinds, then the first `rows` rows tab-separated.
pub fn render_preview(table: &Table, rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} row(s) x {} column(s)\n", table.len(), table.width()));

    let name_width = table.columns().iter().map(|c| c.chars().count()).max().unwrap_or(0);
    for (i, name) in table.columns().iter().enumerate() {
        let kind = table.column_kind(name).map(|k| k.to_string()).unwrap_or_default();
        out.push_str(&format!("  {i:>3}  {name:<name_width$}  {kind}\n"));
    }

    if rows > 0 && !table.is_empty() {
        out.push('\n');
        out.push_str(&table.columns().join("\t"));
        out.push('\n');
        for row in table.rows().iter().take(rows) {
            let cells: Vec<String> = row.iter().map(|v| v.render()).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
    }
    out
}
