//! Implementation of `corral task add/list/show/approve/reject/cancel/retry`.

use super::open_store;
use crate::admin;
use crate::cli::{ProjectIdArgs, TaskAddArgs, TaskIdArgs};
use crate::error::{CorralError, Result};
use crate::registry::{Task, TaskStatus, TaskStatusUpdate, derive_title, generate_id};
use chrono::Utc;
use std::time::Duration;

pub fn cmd_add(config_path: &str, args: TaskAddArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    store.get_project(&args.project_id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("project '{}' not found", args.project_id))
    })?;

    if let Some(dep_id) = &args.depends_on {
        store.get_task(&args.project_id, dep_id)?.ok_or_else(|| {
            CorralError::UserError(format!("depends-on task '{}' not found", dep_id))
        })?;
    }

    let status = if args.plan_mode { TaskStatus::PlanPending } else { TaskStatus::Pending };

    let task = Task {
        id: generate_id(),
        project_id: args.project_id.clone(),
        title: derive_title(&args.description),
        description: args.description,
        priority: args.priority,
        depends_on: args.depends_on,
        plan_mode: args.plan_mode,
        plan: None,
        plan_session_id: None,
        plan_answers: Default::default(),
        plan_messages: Vec::new(),
        worker_id: None,
        branch: None,
        commit_id: None,
        error: None,
        status,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
    };

    store.create_task(&args.project_id, task.clone())?;
    println!("Created task {} ({:?})", task.id, task.status);

    Ok(())
}

pub fn cmd_list(config_path: &str, args: ProjectIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let tasks = store.list_tasks(&args.project_id)?;

    println!("{:10} {:14} {:>4} {}", "ID", "STATUS", "PRI", "TITLE");
    for t in &tasks {
        println!("{:10} {:14} {:>4} {}", t.id, format!("{:?}", t.status), t.priority, t.title);
    }
    println!();
    println!("{} task(s)", tasks.len());

    Ok(())
}

pub fn cmd_show(config_path: &str, args: TaskIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let task = store.get_task(&args.project_id, &args.task_id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("task '{}' not found", args.task_id))
    })?;

    println!("Task {}", task.id);
    println!("  project:     {}", task.project_id);
    println!("  title:       {}", task.title);
    println!("  status:      {:?}", task.status);
    println!("  priority:    {}", task.priority);
    if let Some(dep) = &task.depends_on {
        println!("  depends_on:  {}", dep);
    }
    println!("  plan_mode:   {}", task.plan_mode);
    if let Some(plan) = &task.plan {
        println!("  plan:        {}", plan);
    }
    if let Some(worker) = &task.worker_id {
        println!("  worker_id:   {}", worker);
    }
    if let Some(branch) = &task.branch {
        println!("  branch:      {}", branch);
    }
    if let Some(commit) = &task.commit_id {
        println!("  commit_id:   {}", commit);
    }
    if let Some(err) = &task.error {
        println!("  error:       {}", err);
    }
    println!("  created_at:  {}", task.created_at);
    if let Some(started) = task.started_at {
        println!("  started_at:  {}", started);
    }
    if let Some(completed) = task.completed_at {
        println!("  completed_at: {}", completed);
    }

    Ok(())
}

pub fn cmd_approve(config_path: &str, args: TaskIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let task = store.get_task(&args.project_id, &args.task_id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("task '{}' not found", args.task_id))
    })?;

    if task.status != TaskStatus::PlanPending {
        return Err(CorralError::UserError(format!(
            "task '{}' is not awaiting plan approval (status: {:?})",
            args.task_id, task.status
        )));
    }

    let update = TaskStatusUpdate::new().status(TaskStatus::PlanApproved);
    let updated = store.update_task_status(&args.project_id, &args.task_id, update)?;
    println!("Task {} approved ({:?})", updated.id, updated.status);

    Ok(())
}

pub fn cmd_reject(config_path: &str, args: TaskIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let task = store.get_task(&args.project_id, &args.task_id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("task '{}' not found", args.task_id))
    })?;

    if task.status != TaskStatus::PlanPending {
        return Err(CorralError::UserError(format!(
            "task '{}' is not awaiting plan approval (status: {:?})",
            args.task_id, task.status
        )));
    }

    let update = TaskStatusUpdate::new().status(TaskStatus::Pending).plan(None);
    let updated = store.update_task_status(&args.project_id, &args.task_id, update)?;
    println!("Task {} rejected, returned to pending", updated.id);

    Ok(())
}

pub fn cmd_cancel(config_path: &str, args: TaskIdArgs) -> Result<()> {
    let (config, store) = open_store(config_path)?;
    let grace = Duration::from_secs(config.container_stop_grace_secs);
    let updated = admin::cancel_task(&store, &args.project_id, &args.task_id, grace)?;
    println!("Task {} cancelled", updated.id);
    Ok(())
}

pub fn cmd_retry(config_path: &str, args: TaskIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let updated = admin::retry_task(&store, &args.project_id, &args.task_id)?;
    println!("Task {} re-queued ({:?})", updated.id, updated.status);
    Ok(())
}
