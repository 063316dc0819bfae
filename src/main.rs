use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use cmakesettings_runner::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);
    let log = Arc::new(logging::Logger::new());

    match args.command {
        cli::Command::Run(opts) => commands::run::run(&args.global, &opts, &log),
        cli::Command::Version => commands::version::run(),
    }
}
