// terrastat CLI - config-driven cleaning, reconciliation and analysis of
// territorial statistics tables

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use terrastat_cli::exit_codes::EXIT_SUCCESS;
use terrastat_cli::inspect::cmd_inspect;
use terrastat_cli::run::{cmd_run, cmd_validate, RunArgs};
use terrastat_cli::{logging, CliError};

#[derive(Parser)]
#[command(name = "terrastat")]
#[command(about = "Clean, reconcile and analyse tables keyed by territorial unit codes")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Only log warnings and errors (RUST_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load sources, run the pipeline and analyses from a TOML config
    #[command(after_help = "\
Examples:
  terrastat run fires.toml -o report.json
  terrastat run fires.toml --json > result.json
  terrastat run fires.toml --diagnostics diag.json --strict")]
    Run {
        /// Path to the run config (.toml)
        config: PathBuf,

        /// Write the report to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the full result (meta, report, diagnostics, warnings) as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write diagnostics and warnings to this file
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        /// Exit 7 without writing the report when any warning was raised
        #[arg(long)]
        strict: bool,
    },

    /// Parse and validate a run config without loading anything
    #[command(after_help = "\
Examples:
  terrastat validate fires.toml")]
    Validate {
        /// Path to the run config (.toml)
        config: PathBuf,
    },

    /// Show the columns, column kinds and first rows of one file
    #[command(after_help = "\
Examples:
  terrastat inspect pozary.xlsx --sheet Gminy
  terrastat inspect powierzchnia.csv --rows 20")]
    Inspect {
        /// CSV/TSV or spreadsheet file
        file: PathBuf,

        /// Worksheet name (first sheet by default)
        #[arg(long)]
        sheet: Option<String>,

        /// Rows to preview
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  terrastat-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    let result = match cli.command {
        Commands::Run { config, output, json, diagnostics, strict } => {
            cmd_run(&RunArgs { config, output, json, diagnostics, strict }).map(|_| ())
        }
        Commands::Validate { config } => cmd_validate(&config).map(|_| ()),
        Commands::Inspect { file, sheet, rows } => cmd_inspect(&file, sheet, rows).map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
