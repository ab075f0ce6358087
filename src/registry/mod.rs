//! Registry Store: durable, lock-protected persistence of projects and task
//! queues on the local filesystem.
//!
//! Two state files exist: `projects.json` (guarded by the registry lock) and,
//! per project, `projects/<pid>/tasks.json` (guarded by that project's
//! task-queue lock). Both use the same create_new-exclusive lock mechanism
//! from [`crate::locks`] and atomic JSON writes from [`crate::fs`].

mod claim;
mod ids;
mod paths;
mod project;
mod store;
mod task;

pub use claim::ClaimCandidate;
pub use ids::generate_id;
pub use paths::RegistryPaths;
pub use project::{Project, ProjectSource, ProjectStatus};
pub use store::RegistryStore;
pub use task::{Task, TaskStatus, TaskStatusUpdate, derive_title};
