//! Approval task data models

use crate::models::instance::Values;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for the assignee
    Pending,
    /// Assignee approved
    Approved,
    /// Assignee rejected
    Rejected,
    Skipped,
    Cancelled,
    Claimed,
}

impl TaskStatus {
    /// Anything other than `Pending` is resolved and never changes again
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Approved => "approved",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Claimed => "claimed",
        };
        f.write_str(name)
    }
}

/// One approver's unit of work for one activation of an APPROVAL node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTask {
    /// Unique task identifier
    pub id: Uuid,
    pub instance_id: Uuid,
    pub node_key: String,
    pub node_name: String,
    /// User who must act on the task
    pub assignee: String,
    pub status: TaskStatus,
    /// Free-text comment left on resolution
    #[serde(default)]
    pub comment: String,
    /// Form values submitted on approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<Values>,
    pub created_at: DateTime<Utc>,
    /// When the task was resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Stored only; nothing in the engine enforces it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_resolution() {
        assert!(!TaskStatus::Pending.is_resolved());
        assert!(TaskStatus::Approved.is_resolved());
        assert!(TaskStatus::Rejected.is_resolved());
        assert!(TaskStatus::Claimed.is_resolved());
        assert_eq!(serde_json::to_string(&TaskStatus::Skipped).unwrap(), "\"skipped\"");
    }
}
