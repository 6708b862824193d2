// Atomic JSON output

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use terrastat_analysis::Report;

use crate::error::WriteError;

/// Write the hierarchical result store as pretty JSON.
pub fn write_report(report: &Report, path: &Path) -> Result<(), WriteError> {
    write_json(report, path)
}

/// Serialize fully, write a temp file beside `path`, then persist it over the
/// destination. Nothing is left behind on failure.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), WriteError> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    let io_err = |source| WriteError::Io { path: path.to_path_buf(), source };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(body.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    log::info!("wrote {}", path.display());
    Ok(())
}
