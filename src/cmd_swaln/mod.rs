//! Subcommand modules for the `swaln` binary.

pub mod align;
pub mod args;
pub mod cross;
pub mod jobs;
pub mod run;
