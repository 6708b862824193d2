//! `terrastat-cli`: command implementations behind the `terrastat` binary.
//!
//! Each command returns what it produced so tests can drive it without
//! spawning a process; `main.rs` only parses arguments and maps errors to
//! exit codes.

pub mod error;
pub mod exit_codes;
pub mod inspect;
pub mod logging;
pub mod run;

pub use error::CliError;
