//! CLI entry point for the weightbook rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use weightbook_rebalancer::commands::{self, OnceOptions};
use weightbook_rebalancer::config::Config;
use weightbook_rebalancer::error::Error;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Scheduled fixed-weight and momentum portfolio rebalancer")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the periodic loop
    Run {
        /// Stop after this many ticks (default: run forever)
        #[arg(long)]
        ticks: Option<u64>,

        /// Plan every cycle without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single cycle now
    Once {
        /// Show plan without executing
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Show current positions
    Positions,

    /// Compare actual positions vs the strategy's targets
    Reconcile,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { ticks, dry_run } => {
            commands::run_scheduled(&config, ticks, dry_run).map(|_| ())
        }
        Command::Once { dry_run, force } => {
            commands::run_once(&config, &OnceOptions { dry_run, force })
        }
        Command::Positions => commands::show_positions(&config),
        Command::Reconcile => commands::run_reconcile(&config),
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("\nAborted: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
