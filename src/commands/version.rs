//! The `version` command.

use anyhow::Result;

/// Print the version and exit.
///
/// # Errors
///
/// Never fails; the `Result` keeps the command signatures uniform.
#[allow(clippy::print_stdout)]
pub fn run() -> Result<()> {
    let version = option_env!("CMAKESETTINGS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("cmakesettings {version}");
    Ok(())
}
