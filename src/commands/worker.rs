//! Implementation of `corral worker list`.
//!
//! The CLI is a separate, short-lived process from the daemon that actually
//! owns the in-memory `WorkerPool`, so slot occupancy is reconstructed from
//! the registry rather than queried live: any task in the running-class
//! statuses names the slot holding it via `worker_id`.

use super::open_store;
use crate::error::Result;
use crate::worker::slot_id;

pub fn cmd_list(config_path: &str) -> Result<()> {
    let (config, store) = open_store(config_path)?;

    let mut busy: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    for project in store.list_projects()? {
        for task in store.list_tasks(&project.id)? {
            if task.status.is_running_class() {
                if let Some(worker_id) = &task.worker_id {
                    busy.insert(worker_id.clone(), task.id.clone());
                }
            }
        }
    }

    println!("{:10} {:10} {}", "SLOT", "STATUS", "TASK");
    for i in 1..=config.worker_count {
        let id = slot_id(i);
        match busy.get(&id) {
            Some(task_id) => println!("{:10} {:10} {}", id, "busy", task_id),
            None => println!("{:10} {:10}", id, "idle"),
        }
    }

    Ok(())
}
