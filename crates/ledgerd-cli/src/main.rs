//! ledgerd - background service of the automatic bookkeeping tool
//!
//! Usage:
//!   ledgerd foreground [workspace]   Run the worker attached to the terminal
//!   ledgerd start [workspace]        Daemonize and supervise the worker
//!   ledgerd stop [workspace]         Stop a running daemon
//!   ledgerd restart [workspace]      Stop, then start again
//!   ledgerd status [workspace]       Report whether the daemon is running
//!
//! The `start` path forks before any Tokio runtime exists (see
//! `commands::daemon`), so `main` stays synchronous and each command builds
//! whatever runtime it needs.

mod cli;
mod commands;

use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use commands::EXIT_USAGE;

pub(crate) fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false).compact())
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    let code = match cli.command {
        Command::Foreground { workspace } => commands::run::foreground(workspace),
        Command::Start { workspace } => commands::daemon::start(workspace),
        Command::Stop { workspace } => commands::daemon::stop(workspace),
        Command::Restart { workspace } => commands::daemon::restart(workspace),
        Command::Status { workspace } => commands::daemon::status(workspace),
    };
    std::process::exit(code);
}
