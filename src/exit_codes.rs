//! Exit code constants for the corral CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Validation failure
//! - 3: Git operation failure
//! - 4: Lock acquisition failure
//! - 5: Container runtime failure
//! - 6: Configuration failure
//! - 7: Registry (project/task store) failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or unimplemented command.
pub const USER_ERROR: i32 = 1;

/// Validation failure.
pub const VALIDATION_FAILURE: i32 = 2;

/// Git operation failure: branch creation, worktree, merge errors.
pub const GIT_FAILURE: i32 = 3;

/// Lock acquisition failure: registry or task-queue lock could not be acquired.
pub const LOCK_FAILURE: i32 = 4;

/// Container runtime failure: start, wait, or stop of a worker container failed.
pub const CONTAINER_FAILURE: i32 = 5;

/// Configuration failure: config file missing, unparsable, or invalid.
pub const CONFIG_FAILURE: i32 = 6;

/// Registry failure: project/task store corrupt or unreadable.
pub const REGISTRY_FAILURE: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            VALIDATION_FAILURE,
            GIT_FAILURE,
            LOCK_FAILURE,
            CONTAINER_FAILURE,
            CONFIG_FAILURE,
            REGISTRY_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
        assert_eq!(VALIDATION_FAILURE, 2);
        assert_eq!(GIT_FAILURE, 3);
        assert_eq!(LOCK_FAILURE, 4);
        assert_eq!(CONTAINER_FAILURE, 5);
        assert_eq!(CONFIG_FAILURE, 6);
        assert_eq!(REGISTRY_FAILURE, 7);
    }
}
