//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 2    | CLI usage error (bad args, unreadable config file) |
//! | 3    | Config does not parse or validate                  |
//! | 4    | A source file could not be loaded                  |
//! | 5    | A pipeline stage or analysis failed                |
//! | 6    | Report or diagnostics could not be written         |
//! | 7    | `--strict` and the run produced warnings           |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, config file missing or unreadable.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation failure (including stage order).
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Source file missing, in an unsupported format, or unparseable.
pub const EXIT_LOAD: u8 = 4;

/// A stage or analysis aborted the run.
pub const EXIT_PIPELINE: u8 = 5;

/// Writing the report or diagnostics failed. Nothing was left behind.
pub const EXIT_WRITE: u8 = 6;

/// Run completed but produced warnings and `--strict` was given.
/// The report is not written.
pub const EXIT_STRICT_WARNINGS: u8 = 7;
