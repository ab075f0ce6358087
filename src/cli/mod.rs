//! CLI argument parsing for corral.
//!
//! Corral is operated two ways: `corral serve` runs the daemon (status
//! callback receiver + scheduler loop + startup recovery) for as long as the
//! process lives; every other subcommand is a one-shot operator action that
//! reads or mutates the on-disk registry directly, under the same file locks
//! the daemon uses, and then exits. Two processes — a running daemon and an
//! operator's CLI invocation — can safely touch the same data directory at
//! once; that is the whole point of the lock-protected registry design.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "corral")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the daemon's YAML config file.
    #[arg(long, global = true, default_value = "corral.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the orchestrator daemon: startup recovery, the status callback
    /// receiver, and the scheduler loop. Blocks until killed.
    Serve,

    /// Project registry commands.
    Project(ProjectCommand),

    /// Task commands.
    Task(TaskCommand),

    /// Worker slot commands.
    Worker(WorkerCommand),

    /// Filesystem lock commands.
    Lock(LockCommand),

    /// Run the startup recovery pass against the configured data directory
    /// without starting the daemon. Safe to run while the daemon is down;
    /// refuses nothing the daemon itself wouldn't also do on its own boot.
    Recover,
}

#[derive(Parser, Debug)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// Register a new project and synchronously set up its repo directory
    /// (clone, symlink, or init), leaving it `ready` or `error`.
    Add(ProjectAddArgs),

    /// List registered projects.
    List,

    /// Show one project's details.
    Show(ProjectIdArgs),

    /// Delete a project and best-effort remove its on-disk directory.
    /// Permitted regardless of status.
    Rm(ProjectIdArgs),
}

#[derive(Parser, Debug)]
pub struct ProjectAddArgs {
    /// Display name for the project.
    pub name: String,

    /// Clone from a remote git URL.
    #[arg(long, group = "source")]
    pub remote: Option<String>,

    /// Symlink an existing local git repository.
    #[arg(long, group = "source")]
    pub local: Option<String>,

    /// Initialize a new, empty repository (default if neither --remote nor --local is given).
    #[arg(long, group = "source")]
    pub new: bool,

    /// Base branch name (defaults to the configured project default).
    #[arg(long)]
    pub base_branch: Option<String>,

    /// Git remote name to fetch/push against (defaults to the configured project default).
    #[arg(long)]
    pub remote_name: Option<String>,

    /// Automatically merge successful task branches into the base branch.
    #[arg(long)]
    pub auto_merge: bool,

    /// Push the base branch after an automatic merge (only meaningful with --auto-merge).
    #[arg(long)]
    pub auto_push: bool,

    /// Override the project's merge-and-test command (space-separated argv).
    #[arg(long, value_delimiter = ' ')]
    pub merge_test_command: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ProjectIdArgs {
    pub project_id: String,
}

#[derive(Parser, Debug)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Enqueue a new task on a project.
    Add(TaskAddArgs),

    /// List a project's tasks.
    List(ProjectIdArgs),

    /// Show one task's details.
    Show(TaskIdArgs),

    /// Approve a plan-mode task awaiting review, making it claimable.
    Approve(TaskIdArgs),

    /// Reject a plan-mode task awaiting review, returning it to `pending`.
    Reject(TaskIdArgs),

    /// Cancel a task. Permitted from {pending, plan_pending, plan_approved,
    /// failed} directly, or from {claimed, running, merging, testing} by
    /// stopping its worker container.
    Cancel(TaskIdArgs),

    /// Retry a terminal (or plan_pending) task: plan-mode tasks re-enter
    /// `plan_pending`, others re-enter `pending`.
    Retry(TaskIdArgs),
}

#[derive(Parser, Debug)]
pub struct TaskAddArgs {
    /// Project id the task belongs to.
    pub project_id: String,

    /// Free-form task description. The title is derived from its first line.
    pub description: String,

    /// Priority; higher values are claimed first.
    #[arg(long, default_value_t = 0)]
    pub priority: i64,

    /// Id of a task that must be `completed` before this one is claimable.
    #[arg(long)]
    pub depends_on: Option<String>,

    /// Create in `plan_pending` instead of `pending`, requiring approval before it is claimable.
    #[arg(long)]
    pub plan_mode: bool,
}

#[derive(Parser, Debug)]
pub struct TaskIdArgs {
    pub project_id: String,
    pub task_id: String,
}

#[derive(Parser, Debug)]
pub struct WorkerCommand {
    #[command(subcommand)]
    pub action: WorkerAction,
}

#[derive(Subcommand, Debug)]
pub enum WorkerAction {
    /// List configured worker slots and their current status.
    List,
}

#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List active locks across the registry and every project's task queue.
    List,

    /// Clear a specific stale lock file.
    Clear(LockClearArgs),
}

#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Path to the lock file to clear.
    pub lock_path: String,

    /// Force clearing even if the lock does not look stale.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
