//! Bookings Report CLI - monthly restaurant report from raw booking files

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::{logs, run, show};

/// Environment variable holding the tracing filter
const LOG_ENV: &str = "BOOKINGS_REPORT_LOG";

/// Bookings report - monthly per-restaurant rollup of booking files
#[derive(Parser)]
#[command(name = "bookings-report", version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(
        long,
        global = true,
        env = "BOOKINGS_REPORT_CONF",
        default_value = "conf/settings.json"
    )]
    conf: PathBuf,

    /// Show progress logs
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a bookings file and refresh the monthly report
    Run {
        /// Raw bookings CSV file
        bookings_file: PathBuf,
        /// Write the refreshed report to this CSV file
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the current report
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent runs from the run journal
    Logs {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Show only failed runs
        #[arg(long)]
        errors: bool,
        /// Delete entries older than N days instead of listing
        #[arg(long, value_name = "DAYS")]
        prune_older_than_days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            bookings_file,
            out,
            json,
        } => run::run(&cli.conf, &bookings_file, out.as_deref(), json),
        Commands::Show { json } => show::run(&cli.conf, json),
        Commands::Logs {
            limit,
            errors,
            prune_older_than_days,
            json,
        } => logs::run(&cli.conf, limit, errors, prune_older_than_days, json),
    }
}
