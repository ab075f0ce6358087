//! Implementation of `corral project add/list/show/rm`.

use super::open_store;
use crate::cli::{ProjectAddArgs, ProjectIdArgs};
use crate::error::{CorralError, Result};
use crate::registry::{Project, ProjectSource, ProjectStatus, generate_id};
use chrono::Utc;

pub fn cmd_add(config_path: &str, args: ProjectAddArgs) -> Result<()> {
    let (config, store) = open_store(config_path)?;
    let defaults = &config.project_defaults;

    let source = match (&args.remote, &args.local, args.new) {
        (Some(url), None, false) => ProjectSource::Remote { url: url.clone() },
        (None, Some(path), false) => ProjectSource::Local { path: path.clone() },
        (None, None, _) => ProjectSource::New,
        _ => {
            return Err(CorralError::UserError(
                "only one of --remote, --local, or --new may be given".to_string(),
            ));
        }
    };

    let project = Project {
        id: generate_id(),
        name: args.name,
        remote_url: args.remote.clone(),
        source,
        base_branch: args.base_branch.unwrap_or_else(|| defaults.base_branch.clone()),
        remote_name: args.remote_name.unwrap_or_else(|| defaults.remote.clone()),
        auto_merge: args.auto_merge || defaults.auto_merge,
        auto_push: args.auto_push || defaults.auto_push,
        merge_test_command: if args.merge_test_command.is_empty() {
            vec!["./merge_and_test.sh".to_string()]
        } else {
            args.merge_test_command
        },
        status: ProjectStatus::Cloning,
        error: None,
        created_at: Utc::now(),
    };

    store.create_project(project.clone())?;
    crate::setup::run(&store, &project)?;

    let updated = store.get_project(&project.id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("project '{}' vanished after setup", project.id))
    })?;

    println!("Project {} ({})", updated.id, updated.name);
    println!("  status: {:?}", updated.status);
    if let Some(err) = &updated.error {
        println!("  error:  {}", err);
    }

    Ok(())
}

pub fn cmd_list(config_path: &str) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let projects = store.list_projects()?;

    println!("{:10} {:20} {:10} {}", "ID", "NAME", "STATUS", "BASE");
    for p in &projects {
        println!("{:10} {:20} {:10} {}", p.id, truncate(&p.name, 20), format!("{:?}", p.status), p.base_branch);
    }
    println!();
    println!("{} project(s)", projects.len());

    Ok(())
}

pub fn cmd_show(config_path: &str, args: ProjectIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    let project = store.get_project(&args.project_id)?.ok_or_else(|| {
        CorralError::RegistryError(format!("project '{}' not found", args.project_id))
    })?;
    let tasks = store.list_tasks(&project.id)?;

    println!("Project {}", project.id);
    println!("  name:               {}", project.name);
    println!("  status:             {:?}", project.status);
    println!("  source:             {:?}", project.source);
    println!("  base_branch:        {}", project.base_branch);
    println!("  remote_name:        {}", project.remote_name);
    println!("  auto_merge:         {}", project.auto_merge);
    println!("  auto_push:          {}", project.auto_push);
    println!("  merge_test_command: {}", project.merge_test_command.join(" "));
    if let Some(err) = &project.error {
        println!("  error:              {}", err);
    }
    println!("  tasks:              {}", tasks.len());

    Ok(())
}

pub fn cmd_rm(config_path: &str, args: ProjectIdArgs) -> Result<()> {
    let (_config, store) = open_store(config_path)?;
    store.delete_project(&args.project_id)?;
    println!("Deleted project {}", args.project_id);
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars.saturating_sub(1)).collect::<String>() + "…"
    }
}
