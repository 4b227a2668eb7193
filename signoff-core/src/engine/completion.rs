//! Approval-mode completion rules

use crate::models::task::TaskStatus;
use crate::tree::ApprovalMode;
use serde::{Deserialize, Serialize};

/// Result of evaluating one node activation's tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// More resolutions are needed
    Pending,
    /// Node completed positively; resume at its child
    Approved,
    /// Node vetoed; the instance is rejected
    Rejected,
}

/// Decide whether a node activation is complete given the statuses of all its tasks.
///
/// - `sequence`: the first resolved task decides
/// - `any`: the first approval completes; otherwise a rejection vetoes
/// - `all` / `parallel`: every task must leave pending; any rejection vetoes
pub fn outcome(mode: ApprovalMode, statuses: &[TaskStatus]) -> Outcome {
    let approved = statuses.iter().any(|s| *s == TaskStatus::Approved);
    let rejected = statuses.iter().any(|s| *s == TaskStatus::Rejected);

    match mode {
        ApprovalMode::Sequence | ApprovalMode::Any => {
            if approved {
                Outcome::Approved
            } else if rejected {
                Outcome::Rejected
            } else {
                Outcome::Pending
            }
        }
        ApprovalMode::All | ApprovalMode::Parallel => {
            if statuses.is_empty() || statuses.contains(&TaskStatus::Pending) {
                Outcome::Pending
            } else if rejected {
                Outcome::Rejected
            } else {
                Outcome::Approved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::{Approved, Pending, Rejected, Skipped};

    #[test]
    fn test_sequence_single_task() {
        assert_eq!(outcome(ApprovalMode::Sequence, &[Pending]), Outcome::Pending);
        assert_eq!(outcome(ApprovalMode::Sequence, &[Approved]), Outcome::Approved);
        assert_eq!(outcome(ApprovalMode::Sequence, &[Rejected]), Outcome::Rejected);
    }

    #[test]
    fn test_any_completes_on_first_approval() {
        assert_eq!(
            outcome(ApprovalMode::Any, &[Pending, Approved, Pending]),
            Outcome::Approved
        );
        assert_eq!(outcome(ApprovalMode::Any, &[Pending, Pending]), Outcome::Pending);
        assert_eq!(outcome(ApprovalMode::Any, &[Rejected, Pending]), Outcome::Rejected);
    }

    #[test]
    fn test_all_waits_for_every_task() {
        for mode in [ApprovalMode::All, ApprovalMode::Parallel] {
            assert_eq!(outcome(mode, &[Approved, Pending]), Outcome::Pending);
            assert_eq!(outcome(mode, &[Approved, Approved]), Outcome::Approved);
            assert_eq!(outcome(mode, &[Approved, Rejected]), Outcome::Rejected);
            assert_eq!(outcome(mode, &[Approved, Skipped]), Outcome::Approved);
            assert_eq!(outcome(mode, &[]), Outcome::Pending);
        }
    }
}
