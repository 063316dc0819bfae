//! Command-line interface definition.

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the CMakeSettings.json runner.
#[derive(Parser, Debug)]
#[command(
    name = "cmakesettings",
    about = "Drive cmake configure/build runs from Visual Studio CMakeSettings.json files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Log the commands that would run without executing them
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure (and build) the configurations selected by the filter
    Run(RunOpts),
    /// Print version information
    Version,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunOpts {
    /// Path to the CMakeSettings.json file
    #[arg(short, long, default_value = "CMakeSettings.json")]
    pub settings: std::path::PathBuf,

    /// Regular expression selecting configurations by name
    #[arg(short, long, default_value = ".*")]
    pub filter: String,

    /// Override the workspace root (default: the settings file's directory)
    #[arg(long)]
    pub workspace_root: Option<std::path::PathBuf>,

    /// Build each configuration under <dir>/<configuration name> instead of
    /// the configured buildRoot
    #[arg(long)]
    pub build_dir: Option<std::path::PathBuf>,

    /// Stop after the configure step (building is the default)
    #[arg(long = "configure-only", action = clap::ArgAction::SetFalse)]
    pub build: bool,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_filter() {
        let cli = Cli::parse_from(["cmakesettings", "run", "--filter", "Linux.*"]);
        assert!(matches!(cli.command, Command::Run(_)));
        if let Command::Run(opts) = cli.command {
            assert_eq!(opts.filter, "Linux.*");
        }
    }

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["cmakesettings", "run"]);
        if let Command::Run(opts) = cli.command {
            assert_eq!(opts.settings, std::path::PathBuf::from("CMakeSettings.json"));
            assert_eq!(opts.filter, ".*");
            assert!(opts.build, "building is the default");
            assert!(opts.build_dir.is_none());
        } else {
            panic!("expected run command");
        }
    }

    #[test]
    fn parse_configure_only_disables_build() {
        let cli = Cli::parse_from(["cmakesettings", "run", "--configure-only"]);
        if let Command::Run(opts) = cli.command {
            assert!(!opts.build);
        } else {
            panic!("expected run command");
        }
    }

    #[test]
    fn parse_dry_run_global_flag() {
        let cli = Cli::parse_from(["cmakesettings", "-d", "run"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_verbose_flag() {
        let cli = Cli::parse_from(["cmakesettings", "--verbose", "run"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_version_subcommand() {
        let cli = Cli::parse_from(["cmakesettings", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
