//! Corral: a multi-project task orchestrator that dispatches containerized
//! coding-agent workers over isolated git worktrees.
//!
//! This is the main entry point for the `corral` CLI. It parses arguments,
//! initializes structured logging, dispatches to the appropriate command
//! handler, and maps errors onto the process's exit code.

mod admin;
mod callback;
mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod git_worktree;
pub mod locks;
pub mod logtail;
pub mod recovery;
pub mod registry;
pub mod scheduler;
mod setup;
#[cfg(test)]
pub mod test_support;
pub mod worker;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse_args();

    match commands::dispatch(&cli.config, cli.command).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
