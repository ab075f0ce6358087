//! Command implementations for corral.
//!
//! This module routes parsed CLI commands to their implementations. `serve`
//! owns the daemon's tokio runtime for as long as the process runs; every
//! other command opens the registry at the configured data directory, does
//! one thing, and returns.

mod lock;
mod project;
mod recover;
mod serve;
mod task;
mod worker;

use crate::cli::{Command, LockAction, ProjectAction, TaskAction, WorkerAction};
use crate::config::Config;
use crate::error::Result;

/// Dispatch a parsed command to its implementation.
pub async fn dispatch(config_path: &str, command: Command) -> Result<()> {
    match command {
        Command::Serve => serve::cmd_serve(config_path).await,
        Command::Recover => recover::cmd_recover(config_path),
        Command::Project(cmd) => dispatch_project(config_path, cmd.action),
        Command::Task(cmd) => dispatch_task(config_path, cmd.action),
        Command::Worker(cmd) => dispatch_worker(config_path, cmd.action),
        Command::Lock(cmd) => dispatch_lock(config_path, cmd.action),
    }
}

fn dispatch_project(config_path: &str, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::Add(args) => project::cmd_add(config_path, args),
        ProjectAction::List => project::cmd_list(config_path),
        ProjectAction::Show(args) => project::cmd_show(config_path, args),
        ProjectAction::Rm(args) => project::cmd_rm(config_path, args),
    }
}

fn dispatch_task(config_path: &str, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add(args) => task::cmd_add(config_path, args),
        TaskAction::List(args) => task::cmd_list(config_path, args),
        TaskAction::Show(args) => task::cmd_show(config_path, args),
        TaskAction::Approve(args) => task::cmd_approve(config_path, args),
        TaskAction::Reject(args) => task::cmd_reject(config_path, args),
        TaskAction::Cancel(args) => task::cmd_cancel(config_path, args),
        TaskAction::Retry(args) => task::cmd_retry(config_path, args),
    }
}

fn dispatch_worker(config_path: &str, action: WorkerAction) -> Result<()> {
    match action {
        WorkerAction::List => worker::cmd_list(config_path),
    }
}

fn dispatch_lock(config_path: &str, action: LockAction) -> Result<()> {
    match action {
        LockAction::List => lock::cmd_list(config_path),
        LockAction::Clear(args) => lock::cmd_clear(config_path, args),
    }
}

/// Load config and open the registry store at its configured data directory.
/// Shared by every one-shot command.
fn open_store(config_path: &str) -> Result<(Config, crate::registry::RegistryStore)> {
    let config = Config::load(config_path).or_else(|_| -> Result<Config> { Ok(Config::default()) })?;
    let store = crate::registry::RegistryStore::new(&config.data_dir);
    Ok((config, store))
}
