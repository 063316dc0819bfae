//! CMakeSettings.json runner.
//!
//! Parses Visual-Studio-style `CMakeSettings.json` files, resolves `${var}`
//! property expressions across layered named environments, and drives cmake
//! configure/build invocations — one per selected configuration.
//!
//! The public API is organised into four layers:
//!
//! - **[`settings`]** — parse the settings document and evaluate property
//!   expressions (environments, configurations, the `${}` evaluator)
//! - **[`runner`]** — sequential per-configuration orchestration
//! - **[`exec`] / [`operations`] / [`logging`]** — injectable collaborators
//!   for processes, the filesystem, and output
//! - **[`commands`]** — top-level subcommand handlers (`run`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod runner;
pub mod settings;
