//! Implementation of `corral serve`: the long-running daemon process.
//!
//! Boot order matters: startup recovery must finish before the callback
//! receiver reports anything to workers, and both the scheduler loop and the
//! callback server run for the lifetime of the process, side by side.

use crate::config::Config;
use crate::error::Result;
use crate::events::EventLog;
use crate::registry::RegistryStore;
use crate::scheduler::Scheduler;
use crate::worker::WorkerPool;
use std::sync::Arc;
use std::time::Duration;

pub async fn cmd_serve(config_path: &str) -> Result<()> {
    let config = Arc::new(Config::load(config_path)?);
    let store = RegistryStore::new(&config.data_dir);
    let events = Arc::new(EventLog::new(config.event_log_capacity));

    crate::recovery::run(&store, &events)?;

    let pool = Arc::new(WorkerPool::new(
        config.worker_count,
        Duration::from_secs(config.container_wait_timeout_secs),
        Duration::from_secs(config.container_stop_grace_secs),
    ));

    let scheduler = Scheduler::new(store.clone(), pool.clone(), events.clone(), config.clone());
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    tracing::info!(worker_count = config.worker_count, "corral daemon starting");

    let serve_result = crate::callback::serve(store, events, &config.callback_bind_addr).await;

    scheduler_handle.abort();
    serve_result
}
