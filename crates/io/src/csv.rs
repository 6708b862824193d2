// CSV/TSV import

use std::io::Read;
use std::path::Path;

use terrastat_core::{Table, TableError, Value};

use crate::error::LoadError;
use crate::header_names;

/// Load a delimited text file. `delimiter` of `None` sniffs it.
pub fn load(path: &Path, delimiter: Option<u8>, skip_rows: usize) -> Result<Table, LoadError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    let (header, records) = read_records(&content, delimiter).map_err(|e| LoadError::parse(path, e))?;
    let records: Vec<Vec<String>> = records.into_iter().skip(skip_rows).collect();
    typed_table(header, records).map_err(|e| LoadError::parse(path, e))
}

/// Candidate delimiters in preference order; earlier wins a tie.
const DELIMITERS: [u8; 4] = [b';', b'\t', b',', b'|'];

/// Non-blank lines sampled when sniffing.
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter from the first few non-blank lines.
///
/// A candidate must split the header into at least two fields. Each one is
/// scored by the records agreeing with the header width times that width.
/// Falls back to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = content
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    DELIMITERS
        .iter()
        .filter_map(|&delimiter| {
            let widths = field_counts(&sample, delimiter);
            let header = *widths.first()?;
            if header < 2 {
                return None;
            }
            let agreeing = widths.iter().filter(|&&w| w == header).count();
            Some((agreeing * header, delimiter))
        })
        // min_by_key keeps the first of equal keys
        .min_by_key(|&(score, _)| std::cmp::Reverse(score))
        .map_or(b',', |(_, delimiter)| delimiter)
}

/// Fields per record when `sample` is split on `delimiter`. Stops at the
/// first malformed record.
fn field_counts(sample: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes())
        .records()
        .map_while(Result::ok)
        .map(|record| record.len())
        .collect()
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for
/// spreadsheet-exported files).
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let mut file = std::fs::File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| LoadError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) if s.starts_with('\u{feff}') => Ok(s['\u{feff}'.len_utf8()..].to_string()),
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::info!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Split into header and data records. Short records are padded later.
pub fn read_records(content: &str, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(r) => r?.iter().map(str::to_string).collect(),
        None => Vec::new(),
    };
    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Type each column from its present cells: all `i64` makes an integer
/// column, all `f64` a float column, anything else text. Empty cells and NA
/// markers are missing, and so are non-finite floats.
pub fn typed_table(header: Vec<String>, records: Vec<Vec<String>>) -> Result<Table, TableError> {
    let width = records.iter().map(Vec::len).max().unwrap_or(0).max(header.len());
    let kinds: Vec<CellKind> = (0..width)
        .map(|c| column_kind(records.iter().filter_map(|r| r.get(c)).map(String::as_str)))
        .collect();

    let rows = records
        .into_iter()
        .map(|r| {
            (0..width)
                .map(|c| match r.get(c) {
                    Some(raw) => convert(raw, kinds[c]),
                    None => Value::Missing,
                })
                .collect()
        })
        .collect();
    Table::from_rows(header_names(header, width), rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Text,
}

/// Cell text read as missing in every column.
const NA_MARKERS: [&str; 8] = ["NaN", "nan", "NA", "N/A", "n/a", "#N/A", "null", "NULL"];

fn is_missing_cell(cell: &str) -> bool {
    cell.is_empty() || NA_MARKERS.contains(&cell)
}

fn column_kind<'a>(cells: impl Iterator<Item = &'a str>) -> CellKind {
    let mut kind = CellKind::Int;
    for cell in cells.map(str::trim).filter(|c| !is_missing_cell(c)) {
        if kind == CellKind::Int && cell.parse::<i64>().is_err() {
            kind = CellKind::Float;
        }
        if kind == CellKind::Float && cell.parse::<f64>().is_err() {
            return CellKind::Text;
        }
    }
    kind
}

fn convert(raw: &str, kind: CellKind) -> Value {
    let trimmed = raw.trim();
    if is_missing_cell(trimmed) {
        return Value::Missing;
    }
    match kind {
        CellKind::Int => trimmed.parse().map(Value::Int).unwrap_or(Value::Missing),
        CellKind::Float => match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => Value::Float(x),
            _ => Value::Missing,
        },
        CellKind::Text => Value::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use terrastat_core::ColumnKind;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "TERYT;Gmina;Pożary\n0201011;Bolesławiec;12\n0201022;Bolesławiec;7\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_with_decimal_points() {
        let content = "TERYT,Powierzchnia\n0201011,23.6\n0201022,288.4\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_after_bom_and_blank_lines() {
        let content = "\u{feff}TERYT\tGmina\tLudność\n\n0201011\tBolesławiec\t39000\n\n0201032\tGromadka\t5300\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_single_column_falls_back_to_comma() {
        assert_eq!(sniff_delimiter("TERYT\n0201011\n0201022\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Gmina;Adres;Powiat\n\"Kraków, miasto\";\"ul. Główna 1, lok. 4\";Kraków\nOsiek;\"Rynek 2\";oświęcimski\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_columns_typed_like_dataframe_reader() {
        let content = "TERYT;Gmina;Powierzchnia;Uwagi\n0201011;Bolesławiec;23.6;\n0201022;Bolesławiec;288;x\n";
        let (header, records) = read_records(content, b';').unwrap();
        let t = typed_table(header, records).unwrap();

        // leading zero lost, as a dataframe reader would
        assert_eq!(t.get(0, "TERYT"), Some(&Value::Int(201011)));
        assert_eq!(t.get(1, "Powierzchnia"), Some(&Value::Float(288.0)));
        assert_eq!(t.get(0, "Uwagi"), Some(&Value::Missing));
        assert_eq!(t.get(1, "Uwagi"), Some(&Value::from("x")));
        assert_eq!(t.get(0, "Gmina"), Some(&Value::from("Bolesławiec")));
    }

    #[test]
    fn test_na_markers_and_non_finite_are_missing() {
        let content = "TERYT;Ludność;Gęstość;Uwagi\n0201011;39000;NaN;NA\n0201022;N/A;inf;x\n0201032;5300;20.1;null\n";
        let (header, records) = read_records(content, b';').unwrap();
        let t = typed_table(header, records).unwrap();

        assert_eq!(t.column_kind("Ludność"), Some(ColumnKind::Integer));
        assert_eq!(t.get(1, "Ludność"), Some(&Value::Missing));
        assert_eq!(t.column_kind("Gęstość"), Some(ColumnKind::Float));
        assert_eq!(t.get(0, "Gęstość"), Some(&Value::Missing));
        assert_eq!(t.get(1, "Gęstość"), Some(&Value::Missing));
        assert_eq!(t.get(2, "Gęstość"), Some(&Value::Float(20.1)));
        assert_eq!(t.get(0, "Uwagi"), Some(&Value::Missing));
        assert_eq!(t.get(2, "Uwagi"), Some(&Value::Missing));
        assert_eq!(t.get(1, "Uwagi"), Some(&Value::from("x")));
    }

    #[test]
    fn test_ragged_rows_padded_and_headers_named() {
        let content = "a,,a\n1,2,3,4\n5\n";
        let (header, records) = read_records(content, b',').unwrap();
        let t = typed_table(header, records).unwrap();
        assert_eq!(t.columns(), &["a", "column_2", "a.1", "column_4"]);
        assert_eq!(t.get(1, "a.1"), Some(&Value::Missing));
        assert_eq!(t.get(0, "column_4"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cp1252.csv");
        // "Gmina;Opis\nA;caf\xe9\n" with é in Windows-1252
        fs::write(&path, b"Gmina;Opis\nA;caf\xe9\n").unwrap();
        let t = load(&path, None, 0).unwrap();
        assert_eq!(t.get(0, "Opis"), Some(&Value::from("café")));
    }

    #[test]
    fn test_skip_rows_before_typing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("units.csv");
        fs::write(&path, "TERYT,Ludność\nkod,osoby\n0201011,39000\n").unwrap();
        let t = load(&path, None, 1).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "Ludność"), Some(&Value::Int(39000)));
    }
}
