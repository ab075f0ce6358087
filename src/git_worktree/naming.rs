//! Branch naming for task worktrees.

/// Fixed prefix for all task branches dispatched by corral.
pub const BRANCH_PREFIX: &str = "claude/";

/// Generate the conventional branch name for a task.
///
/// Format: `claude/{task_id}`
pub fn task_branch_name(task_id: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, task_id)
}

/// Returns the task id embedded in a branch name, if it is a corral task branch.
pub fn task_id_from_branch(branch: &str) -> Option<&str> {
    branch.strip_prefix(BRANCH_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_branch_name() {
        assert_eq!(task_branch_name("abc123"), "claude/abc123");
    }

    #[test]
    fn test_task_id_from_branch() {
        assert_eq!(task_id_from_branch("claude/abc123"), Some("abc123"));
        assert_eq!(task_id_from_branch("main"), None);
        assert_eq!(task_id_from_branch("feature/foo"), None);
    }
}
