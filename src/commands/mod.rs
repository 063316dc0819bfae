//! Top-level subcommand orchestration.

pub mod run;
pub mod version;
