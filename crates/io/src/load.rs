use std::path::Path;

use terrastat_core::Table;

use crate::error::LoadError;
use crate::{csv, sheet};

/// How to cut a table out of a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Worksheet name; first sheet when `None`. Ignored for delimited text.
    pub sheet: Option<String>,
    /// Data rows dropped after the header.
    pub skip_rows: usize,
    /// Positional column window `[column_start, column_end)`.
    pub column_start: Option<usize>,
    pub column_end: Option<usize>,
    /// Replacement names, applied after the window.
    pub names: Option<Vec<String>>,
    /// Field delimiter for text files; sniffed when `None`.
    pub delimiter: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Delimited(Option<u8>),
    Spreadsheet,
}

fn format_of(path: &Path) -> Result<Format, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => Ok(Format::Delimited(None)),
        "tsv" | "tab" => Ok(Format::Delimited(Some(b'\t'))),
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(Format::Spreadsheet),
        _ => Err(LoadError::UnsupportedFormat { path: path.to_path_buf(), extension: ext }),
    }
}

/// Whether `path` names a workbook (and so has sheets).
pub fn is_spreadsheet(path: &Path) -> bool {
    matches!(format_of(path), Ok(Format::Spreadsheet))
}

/// Load one source table.
pub fn load(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let table = match format_of(path)? {
        Format::Delimited(default) => csv::load(path, options.delimiter.or(default), options.skip_rows)?,
        Format::Spreadsheet => sheet::load(path, options.sheet.as_deref(), options.skip_rows)?,
    };

    let table = match (options.column_start, options.column_end) {
        (None, None) => table,
        (start, end) => {
            let start = start.unwrap_or(0);
            let end = end.unwrap_or(table.width());
            if start > end {
                return Err(LoadError::parse(
                    path,
                    format!("column window {start}..{end} is inverted"),
                ));
            }
            table.slice_columns(start, end)
        }
    };

    let table = match &options.names {
        Some(names) => {
            if names.len() != table.width() {
                return Err(LoadError::parse(
                    path,
                    format!("{} name(s) given for {} column(s)", names.len(), table.width()),
                ));
            }
            table.with_column_names(names.iter().cloned()).map_err(|e| LoadError::parse(path, e))?
        }
        None => table,
    };

    log::info!("loaded {}: {} row(s) x {} column(s)", path.display(), table.len(), table.width());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use terrastat_core::Value;

    const FIRES: &str = "Kod;Gmina;Powiat;Pożary;Uwagi\n0201011;Bolesławiec;bolesławiecki;12;\n0201022;Bolesławiec;bolesławiecki;7;wiejska\n";

    #[test]
    fn window_and_names_applied_after_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pozary.csv");
        fs::write(&path, FIRES).unwrap();

        let options = LoadOptions {
            column_start: Some(0),
            column_end: Some(4),
            names: Some(vec!["TERYT".into(), "Gmina".into(), "Powiat".into(), "Pożary".into()]),
            ..Default::default()
        };
        let t = load(&path, &options).unwrap();
        assert_eq!(t.columns(), &["TERYT", "Gmina", "Powiat", "Pożary"]);
        assert_eq!(t.get(1, "TERYT"), Some(&Value::Int(201022)));
        assert_eq!(t.get(1, "Pożary"), Some(&Value::Int(7)));
    }

    #[test]
    fn open_ended_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pozary.csv");
        fs::write(&path, FIRES).unwrap();

        let options = LoadOptions { column_start: Some(3), ..Default::default() };
        let t = load(&path, &options).unwrap();
        assert_eq!(t.columns(), &["Pożary", "Uwagi"]);
    }

    #[test]
    fn name_count_mismatch_is_parse_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pozary.csv");
        fs::write(&path, FIRES).unwrap();

        let options = LoadOptions { names: Some(vec!["TERYT".into()]), ..Default::default() };
        assert!(matches!(load(&path, &options).unwrap_err(), LoadError::ParseFailure { .. }));
    }

    #[test]
    fn tsv_uses_tab() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("areas.tsv");
        fs::write(&path, "TERYT\tPowierzchnia\n201011\t23,6\n").unwrap();
        let t = load(&path, &LoadOptions::default()).unwrap();
        // decimal comma is not a number
        assert_eq!(t.get(0, "Powierzchnia"), Some(&Value::from("23,6")));
    }

    #[test]
    fn spreadsheet_extensions() {
        assert!(is_spreadsheet(Path::new("dane/pozary.XLSX")));
        assert!(is_spreadsheet(Path::new("gminy.ods")));
        assert!(!is_spreadsheet(Path::new("gminy.csv")));
        assert!(!is_spreadsheet(Path::new("README")));
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("absent.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        fs::write(&path, b"PAR1").unwrap();
        let err = load(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { ref extension, .. } if extension == "parquet"));
    }
}
