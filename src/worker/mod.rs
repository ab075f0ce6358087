//! Worker Pool: fixed slots dispatching containerized coding-agent workers.

mod container;
mod pool;
mod slot;

pub use container::{ContainerExit, stop_container};
pub use pool::WorkerPool;
pub use slot::{WorkerSlot, WorkerStatus, container_name, slot_id};
