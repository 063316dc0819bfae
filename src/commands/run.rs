//! The `run` command: configure (and build) matching configurations.

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, RunOpts};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::operations::SystemFileSystemOps;
use crate::runner::{CMakeSettingsRunner, Context};

/// Run the `run` command.
///
/// # Errors
///
/// Returns an error if the settings file cannot be loaded, the filter is
/// invalid or matches nothing, or a configure/build step fails.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<()> {
    let version = option_env!("CMAKESETTINGS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("cmakesettings {version}"));

    let runner = CMakeSettingsRunner::new(
        opts.settings.clone(),
        opts.workspace_root.clone(),
        &opts.filter,
        opts.build_dir.clone(),
        opts.build,
    )?;
    let ctx = Context::new(
        Arc::clone(log) as Arc<dyn Log>,
        Arc::new(SystemExecutor),
        Arc::new(SystemFileSystemOps),
        global.dry_run,
    );

    let result = runner.run(&ctx);
    log.print_summary();
    result
}
