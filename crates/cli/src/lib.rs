pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "teetime",
    about = "Teetime operator CLI",
    long_about = "Operate the tee-time booking engine: migrations, config inspection, readiness checks, and due-booking sweeps.",
    after_help = "Examples:\n  teetime doctor --json\n  teetime due --at 2025-12-13T12:30:00Z\n  teetime sweep"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, booking window, backend, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List bookings a sweep would execute, without executing them")]
    Due {
        #[arg(long, help = "Evaluate at this RFC 3339 instant instead of now")]
        at: Option<String>,
    },
    #[command(about = "Execute every due booking once and print the run report")]
    Sweep {
        #[arg(long, help = "Run as if the current time were this RFC 3339 instant")]
        at: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Due { at } => commands::due::run(at.as_deref()),
        Command::Sweep { at } => commands::sweep::run(at.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
