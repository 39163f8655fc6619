pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "fleetpulse",
    about = "Fleetpulse operator CLI",
    long_about = "Operate the Fleetpulse maintenance digest: migrations, demo data, config \
                  inspection, readiness checks, and digest dry-runs.",
    after_help = "Examples:\n  fleetpulse doctor --json\n  fleetpulse seed\n  \
                  fleetpulse digest --at 2026-10-19T06:00:00Z"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo fleet (free, personal, business, muted)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, digest credentials, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview the maintenance digest run as JSON without sending anything")]
    Digest {
        #[arg(long, help = "Evaluate as of this RFC 3339 timestamp instead of now")]
        at: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Digest { at } => commands::digest::run(at.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
