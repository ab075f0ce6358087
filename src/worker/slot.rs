//! Worker slot state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle status of a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Stopped,
    Error,
}

/// One of the fixed `worker_count` slots created at startup. Slots are never
/// destroyed; a slot transitions between idle and busy for the lifetime of
/// the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSlot {
    pub id: String,
    pub status: WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub completed_count: u64,
    pub last_activity: DateTime<Utc>,
}

impl WorkerSlot {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: WorkerStatus::Idle,
            container_id: None,
            task_id: None,
            completed_count: 0,
            last_activity: Utc::now(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == WorkerStatus::Idle
    }
}

/// Conventional slot id: `worker-1` .. `worker-N`.
pub fn slot_id(index: u32) -> String {
    format!("worker-{}", index)
}

/// Container name for a slot: unique per daemon instance's worker naming
/// prefix so a restart can recognize and forcibly remove its own leftovers.
pub fn container_name(slot_id: &str) -> String {
    format!("corral-{}", slot_id)
}
