//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ledgerd - background service of the automatic bookkeeping tool
#[derive(Parser)]
#[command(name = "ledgerd")]
#[command(about = "On-device auto-bookkeeping daemon", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the worker in this process, attached to the terminal
    Foreground {
        /// Workspace directory (probed from the candidate list if omitted)
        workspace: Option<PathBuf>,
    },

    /// Daemonize and supervise the worker, restarting it on exit
    Start {
        workspace: Option<PathBuf>,
    },

    /// Stop a running daemon
    Stop {
        workspace: Option<PathBuf>,
    },

    /// Stop, then start again
    Restart {
        workspace: Option<PathBuf>,
    },

    /// Report whether the daemon is running
    Status {
        workspace: Option<PathBuf>,
    },
}
