mod cli;
mod commands;
mod engine;
mod manifest;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ProviderArgs};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// `--file`, if given
    pub file: Option<PathBuf>,
    /// Overall deadline for remote calls
    pub timeout: Option<Duration>,
    pub provider: ProviderArgs,
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
        timeout: cli.timeout.map(Duration::from_secs),
        provider: cli.provider,
    };

    match cli.command {
        Command::Plan(args) => commands::reconcile::plan(&ctx, args),
        Command::Apply(args) => commands::reconcile::apply(&ctx, args),
        Command::Destroy(args) => commands::reconcile::destroy(&ctx, args),
        Command::Refresh(args) => commands::reconcile::refresh(&ctx, args),
        Command::Import { kind, name, id } => commands::tracked::import(&ctx, kind, &name, &id),
        Command::Show { address } => commands::tracked::show(&ctx, address.as_deref()),
        Command::State(cmd) => commands::tracked::run(&ctx, cmd),
        Command::List {
            kind,
            environment_id,
        } => commands::remote::list(&ctx, kind, environment_id.as_deref()),
        Command::Get { kind, id } => commands::remote::get(&ctx, kind, &id),
        Command::Job(cmd) => commands::remote::job(&ctx, cmd),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "kcp", &mut io::stdout());
            Ok(())
        }
    }
}
