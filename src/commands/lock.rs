//! Implementation of `corral lock list/clear`.

use super::open_store;
use crate::cli::LockClearArgs;
use crate::error::Result;
use crate::locks::{clear_lock, list_locks};
use std::path::PathBuf;

pub fn cmd_list(config_path: &str) -> Result<()> {
    let (config, store) = open_store(config_path)?;
    let stale_minutes = config.lock_stale_minutes;

    let mut locks = list_locks(store.paths().data_dir(), stale_minutes)?;
    for project in store.list_projects()? {
        locks.extend(list_locks(&store.paths().project_dir(&project.id), stale_minutes)?);
    }

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    for lock in &locks {
        println!("{}", lock);
    }
    println!();
    println!("{} active lock(s)", locks.len());

    Ok(())
}

pub fn cmd_clear(config_path: &str, args: LockClearArgs) -> Result<()> {
    let (config, _store) = open_store(config_path)?;
    let lock_path = PathBuf::from(&args.lock_path);

    if !args.force {
        let info = list_locks(
            lock_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
            config.lock_stale_minutes,
        )?
        .into_iter()
        .find(|l| l.path == lock_path);

        if let Some(info) = info {
            if !info.is_stale {
                return Err(crate::error::CorralError::UserError(format!(
                    "lock '{}' does not look stale; pass --force to clear anyway",
                    args.lock_path
                )));
            }
        }
    }

    let cleared = clear_lock(&lock_path, config.lock_stale_minutes)?;
    println!("Cleared lock: {}", cleared);

    Ok(())
}
