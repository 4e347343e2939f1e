pub mod aggregator;
pub mod clock;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod events;
pub mod format;
pub mod gateway;
pub mod history;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod receipt;
pub mod reset;
pub mod rest;
pub mod rollover;

#[cfg(test)]
mod tests;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::{maintenance, reports, sales, App, ConsoleEvents};
use config::Config;
use error::{AppError, ErrorKind};
use models::CandidateItem;

// 2 is clap's usage error.
const EXIT_VALIDATION: u8 = 3;
const EXIT_PERSISTENCE: u8 = 4;
const EXIT_CONFIGURATION: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "shopdash", version, about = "Daily sales dashboard for a single shop")]
pub struct Cli {
    /// Config file (default: the user config dir, shop-dashboard/config.toml)
    #[arg(long, global = true, env = "SHOPDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a sale, e.g. `shopdash record Tea:20x3 Coffee:15`
    Record {
        /// Items as NAME:PRICE[xQTY]; invalid ones are dropped
        #[arg(required = true)]
        items: Vec<CandidateItem>,

        /// Skip printing the receipt
        #[arg(long)]
        no_receipt: bool,
    },
    /// Today's total and transaction count
    Summary,
    /// Previous days' totals, newest first
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Test the connection and create today's record if missing
    Check,
    /// Delete ALL sales data; pass --yes twice to skip both prompts
    Reset {
        #[arg(long, action = ArgAction::Count)]
        yes: u8,
    },
    /// Interactive register with day-change monitoring
    Watch,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let app = match connect(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(exit_code(e.kind()));
        }
    };

    // Failures from here on were already printed by the session listener.
    match execute(&app, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(exit_code(e.kind())),
    }
}

fn connect(cli: &Cli) -> Result<App, AppError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Command::History { limit: Some(limit) } = &cli.command {
        config.history_limit = *limit;
    }

    let events: Box<dyn events::DashboardEvents> = match cli.command {
        Command::Watch => Box::new(ConsoleEvents::live()),
        _ => Box::new(ConsoleEvents::quiet()),
    };
    App::connect(config, events)
}

fn execute(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Record { items, no_receipt } => sales::record(app, &items, !no_receipt).map(|_| ()),
        Command::Summary => reports::summary(app).map(|_| ()),
        Command::History { .. } => reports::history(app).map(|_| ()),
        Command::Check => maintenance::check(app),
        Command::Reset { yes } => maintenance::reset(app, yes).map(|_| ()),
        Command::Watch => maintenance::watch(app),
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => EXIT_VALIDATION,
        ErrorKind::Persistence => EXIT_PERSISTENCE,
        ErrorKind::Configuration => EXIT_CONFIGURATION,
    }
}
