//! Task model: a unit of agent work scoped to one project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum length of a derived task title, in characters.
pub const TITLE_MAX_CHARS: usize = 50;

/// Task lifecycle status.
///
/// See the state machine in the system design: `created` tasks start in
/// `Pending` (or `PlanPending` when plan mode is requested); terminal
/// statuses are `Completed`, `Failed`, and `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    PlanPending,
    PlanApproved,
    Claimed,
    Running,
    Merging,
    Testing,
    MergePending,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses hold no worker slot and have no active lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// Statuses claim_next may hand to the scheduler.
    pub fn is_claimable(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::PlanApproved)
    }

    /// Statuses in which a task holds an active worker slot.
    pub fn is_running_class(self) -> bool {
        matches!(
            self,
            TaskStatus::Claimed | TaskStatus::Running | TaskStatus::Merging | TaskStatus::Testing
        )
    }

    /// Statuses a direct (non-running) cancel is permitted from.
    pub fn is_direct_cancellable(self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::PlanPending | TaskStatus::PlanApproved | TaskStatus::Failed
        )
    }

    /// Statuses from which a retry is permitted (terminal plus plan_pending).
    pub fn is_retryable(self) -> bool {
        self.is_terminal() || matches!(self, TaskStatus::PlanPending)
    }
}

/// A task scoped to one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub plan_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plan_answers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Derive a task title from the first `TITLE_MAX_CHARS` characters of the
/// first line of its description.
pub fn derive_title(description: &str) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= TITLE_MAX_CHARS {
        first_line.to_string()
    } else {
        first_line.chars().take(TITLE_MAX_CHARS).collect()
    }
}

/// A partial update applied to a task by the registry's `update_task_status`.
///
/// Every field is optional; only `Some` fields are written. Setting `status`
/// to `Completed` stamps `completed_at` automatically. The store refuses to
/// apply any update to a task whose current status is terminal.
#[derive(Debug, Clone, Default)]
pub struct TaskStatusUpdate {
    pub status: Option<TaskStatus>,
    pub error: Option<Option<String>>,
    pub commit_id: Option<Option<String>>,
    pub plan: Option<Option<String>>,
    pub branch: Option<Option<String>>,
    pub plan_messages: Option<Vec<Value>>,
    pub plan_session_id: Option<Option<String>>,
    pub plan_answers: Option<BTreeMap<String, String>>,
    pub depends_on: Option<Option<String>>,
    pub worker_id: Option<Option<String>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
}

impl TaskStatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn commit_id(mut self, commit_id: Option<String>) -> Self {
        self.commit_id = Some(commit_id);
        self
    }

    pub fn branch(mut self, branch: Option<String>) -> Self {
        self.branch = Some(branch);
        self
    }

    pub fn plan(mut self, plan: Option<String>) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn worker_id(mut self, worker_id: Option<String>) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(Some(started_at));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_truncates_first_line() {
        let desc = format!("{}\nsecond line", "a".repeat(80));
        let title = derive_title(&desc);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn derive_title_keeps_short_line_whole() {
        assert_eq!(derive_title("add hello\nmore detail"), "add hello");
    }

    #[test]
    fn terminal_statuses_are_not_claimable() {
        for s in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            assert!(s.is_terminal());
            assert!(!s.is_claimable());
        }
    }

    #[test]
    fn plan_approved_and_pending_are_claimable() {
        assert!(TaskStatus::Pending.is_claimable());
        assert!(TaskStatus::PlanApproved.is_claimable());
        assert!(!TaskStatus::PlanPending.is_claimable());
    }
}
