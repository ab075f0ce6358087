//! Cross-project candidate ranking for `RegistryStore::claim_next`.

use super::project::Project;
use super::task::{Task, TaskStatus};

/// A claimable task paired with its owning project, collected during the
/// snapshot phase of `claim_next`.
#[derive(Debug, Clone)]
pub struct ClaimCandidate {
    pub project: Project,
    pub task: Task,
}

/// Tier a status falls into for claim ordering: `plan_approved` always wins
/// over plain `pending`, regardless of priority or age.
fn status_tier(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::PlanApproved => 0,
        _ => 1,
    }
}

/// Pick the best candidate: lowest status tier, then highest priority, then
/// earliest creation time, then lowest task id as a final tiebreaker.
pub fn pick_winner(mut candidates: Vec<ClaimCandidate>) -> Option<ClaimCandidate> {
    candidates.sort_by(|a, b| {
        status_tier(a.task.status)
            .cmp(&status_tier(b.task.status))
            .then(b.task.priority.cmp(&a.task.priority))
            .then(a.task.created_at.cmp(&b.task.created_at))
            .then(a.task.id.cmp(&b.task.id))
    });
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::project::{ProjectSource, ProjectStatus};
    use chrono::{Duration, Utc};

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: "p".to_string(),
            source: ProjectSource::New,
            remote_url: None,
            base_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            auto_merge: false,
            auto_push: false,
            merge_test_command: vec!["./merge_and_test.sh".to_string()],
            status: ProjectStatus::Ready,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn task(id: &str, priority: i64, status: TaskStatus, created_offset_secs: i64) -> Task {
        Task {
            id: id.to_string(),
            project_id: "p".to_string(),
            title: "t".to_string(),
            description: "t".to_string(),
            priority,
            depends_on: None,
            plan_mode: false,
            plan: None,
            plan_session_id: None,
            plan_answers: Default::default(),
            plan_messages: Vec::new(),
            worker_id: None,
            branch: None,
            commit_id: None,
            error: None,
            status,
            created_at: Utc::now() + Duration::seconds(created_offset_secs),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn plan_approved_beats_pending_regardless_of_priority() {
        let candidates = vec![
            ClaimCandidate { project: project("p"), task: task("t1", 100, TaskStatus::Pending, 0) },
            ClaimCandidate { project: project("p"), task: task("t2", 0, TaskStatus::PlanApproved, 0) },
        ];
        let winner = pick_winner(candidates).unwrap();
        assert_eq!(winner.task.id, "t2");
    }

    #[test]
    fn earlier_creation_breaks_priority_ties() {
        let candidates = vec![
            ClaimCandidate { project: project("p"), task: task("t1", 5, TaskStatus::Pending, 10) },
            ClaimCandidate { project: project("p"), task: task("t2", 5, TaskStatus::Pending, 0) },
        ];
        let winner = pick_winner(candidates).unwrap();
        assert_eq!(winner.task.id, "t2");
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert!(pick_winner(Vec::new()).is_none());
    }
}
