mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod render;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{Config, Settings};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "siteseed", &mut io::stdout());
        return Ok(());
    }

    // doctor reports a broken settings file instead of failing on it
    let (settings, settings_path) = match Settings::load() {
        Ok((settings, path)) => (settings, Some(path)),
        Err(err) if matches!(cli.command, Command::Doctor) => {
            log::warn!("{err:#}");
            (Settings::default(), paths::settings_file().ok())
        }
        Err(err) => return Err(err),
    };
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: Config::resolve(
            &cli.connection,
            cli.manifest.as_deref(),
            settings,
            settings_path,
        ),
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Status(args) => commands::status::run(&ctx, &args),
        Command::Policies { name } => commands::policies::run(&ctx, name.as_deref()),
        Command::Manifest(cmd) => commands::manifest::run(&ctx, &cmd),
        Command::Doctor => commands::doctor::run(&ctx),
        Command::Completions { .. } => Ok(()),
    }
}
