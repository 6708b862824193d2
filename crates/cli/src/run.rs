//! `terrastat run` and `terrastat validate`: config-driven pipeline runs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use terrastat_core::{Severity, Warning};
use terrastat_io::{write_json, write_report, LoadOptions};
use terrastat_recon::model::RunMeta;
use terrastat_recon::{Diagnostic, RunConfig, RunInput, RunResult, SourceConfig};

use crate::error::CliError;
use crate::exit_codes::EXIT_STRICT_WARNINGS;

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: PathBuf,
    /// Report destination.
    pub output: Option<PathBuf>,
    /// Print the full result as JSON on stdout.
    pub json: bool,
    /// Diagnostics destination.
    pub diagnostics: Option<PathBuf>,
    /// Fail when the run produced any warning.
    pub strict: bool,
}

/// Diagnostics file body: everything about the run except the report.
#[derive(Serialize)]
struct DiagnosticsFile<'a> {
    meta: &'a RunMeta,
    diagnostics: &'a [Diagnostic],
    warnings: &'a [Warning],
}

/// Read and validate a config file.
pub fn read_config(path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    RunConfig::from_toml(&config_str).map_err(CliError::config)
}

pub fn load_options(source: &SourceConfig) -> LoadOptions {
    LoadOptions {
        sheet: source.sheet.clone(),
        skip_rows: source.skip_rows,
        column_start: source.column_start,
        column_end: source.column_end,
        names: source.names.clone(),
        delimiter: None,
    }
}

/// Load every source, resolving file paths against `base_dir`.
pub fn load_sources(config: &RunConfig, base_dir: &Path) -> Result<RunInput, CliError> {
    let mut input = RunInput::new();
    for source in &config.sources {
        let path = base_dir.join(&source.file);
        let table = terrastat_io::load(&path, &load_options(source)).map_err(|e| CliError::load(&source.name, e))?;
        input = input.with_table(source.name.clone(), table);
    }
    Ok(input)
}

pub fn cmd_run(args: &RunArgs) -> Result<RunResult, CliError> {
    let config = read_config(&args.config)?;

    // Resolve file paths relative to config file's directory
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));
    let input = load_sources(&config, base_dir)?;

    let result = terrastat_recon::run(&config, &input).map_err(CliError::pipeline)?;
    print_summary(&result);

    if let Some(ref path) = args.diagnostics {
        let body = DiagnosticsFile {
            meta: &result.meta,
            diagnostics: &result.diagnostics,
            warnings: &result.warnings,
        };
        write_json(&body, path).map_err(CliError::write)?;
        eprintln!("wrote {}", path.display());
    }

    let warnings = result.warning_count();
    if args.strict && warnings > 0 {
        return Err(CliError::new(EXIT_STRICT_WARNINGS, format!("{warnings} warning(s) under --strict"))
            .with_hint("the report was not written; rerun without --strict to keep it"));
    }

    if let Some(ref path) = args.output {
        write_report(&result.report, path).map_err(CliError::write)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::write(e.into()))?;
        println!("{json_str}");
    }

    Ok(result)
}

pub fn cmd_validate(config_path: &Path) -> Result<RunConfig, CliError> {
    let config = read_config(config_path)?;
    eprintln!(
        "valid: '{}' with {} source(s), {} stage(s), {} analysis(es)",
        config.name,
        config.sources.len(),
        config.stages.len(),
        config.analyses.len(),
    );
    Ok(config)
}

fn print_summary(result: &RunResult) {
    let mut removed = 0;
    for d in &result.diagnostics {
        if let Diagnostic::RowsRemoved { removed: n, .. } = d {
            removed += n;
        }
    }
    eprintln!(
        "run '{}': {} stage(s), {} row(s) removed, {} message(s), {} warning(s)",
        result.meta.config_name,
        result.meta.stages_run,
        removed,
        result.warnings.len(),
        result.warning_count(),
    );
    for w in result.warnings.iter().filter(|w| w.severity >= Severity::Caution) {
        eprintln!("  {w}");
    }
}
