// Source loading and report writing

pub mod csv;
pub mod error;
pub mod load;
pub mod sheet;
pub mod write;

pub use error::{LoadError, WriteError};
pub use load::{is_spreadsheet, load, LoadOptions};
pub use write::{write_json, write_report};

use std::collections::HashSet;

/// Header row to unique column names, `width` long.
///
/// Blank or absent cells become `column_N` (1-based position); repeated names
/// get `.1`, `.2`, ... suffixes in order of appearance.
pub(crate) fn header_names(header: Vec<String>, width: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(width);
    for i in 0..width {
        let raw = header.get(i).map(|h| h.trim()).unwrap_or("");
        let base = if raw.is_empty() { format!("column_{}", i + 1) } else { raw.to_string() };

        let mut name = base.clone();
        let mut n = 1;
        while !seen.insert(name.clone()) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_repeated_headers() {
        let header = vec!["TERYT".to_string(), " ".to_string(), "Gmina".to_string(), "Gmina".to_string()];
        assert_eq!(header_names(header, 5), vec!["TERYT", "column_2", "Gmina", "Gmina.1", "column_5"]);
    }

    #[test]
    fn suffix_skips_taken_names() {
        let header = vec!["a".to_string(), "a.1".to_string(), "a".to_string()];
        assert_eq!(header_names(header, 3), vec!["a", "a.1", "a.2"]);
    }
}
