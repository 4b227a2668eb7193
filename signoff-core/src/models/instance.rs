//! Workflow instance data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Name-to-value mapping used for process variables and form values
pub type Values = Map<String, Value>;

/// Instance status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Created but not yet started
    Draft,
    /// Executing or waiting on approval tasks
    Running,
    /// Reached an END node
    Approved,
    /// Vetoed by a task rejection
    Rejected,
    /// Cancelled by an operator
    Cancelled,
    /// Administratively paused
    Suspended,
}

impl InstanceStatus {
    /// Terminal statuses never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Approved | InstanceStatus::Rejected | InstanceStatus::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Draft, Running)
                | (Running, Approved)
                | (Running, Rejected)
                | (Running, Cancelled)
                | (Running, Suspended)
                | (Suspended, Running)
        )
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceStatus::Draft => "draft",
            InstanceStatus::Running => "running",
            InstanceStatus::Approved => "approved",
            InstanceStatus::Rejected => "rejected",
            InstanceStatus::Cancelled => "cancelled",
            InstanceStatus::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InstanceStatus::Draft),
            "running" => Ok(InstanceStatus::Running),
            "approved" => Ok(InstanceStatus::Approved),
            "rejected" => Ok(InstanceStatus::Rejected),
            "cancelled" => Ok(InstanceStatus::Cancelled),
            "suspended" => Ok(InstanceStatus::Suspended),
            other => Err(format!("unknown instance status '{}'", other)),
        }
    }
}

/// One execution of a process definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique instance identifier
    pub id: Uuid,
    /// Definition being executed
    pub definition_id: Uuid,
    /// Instance title
    pub title: String,
    /// Business correlation key
    #[serde(default)]
    pub business_key: String,
    /// Business correlation type
    #[serde(default)]
    pub business_type: String,
    /// Free-form business payload
    #[serde(default)]
    pub business_data: Value,
    /// Form values submitted at start, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data_id: Option<Uuid>,
    /// Overall status
    pub status: InstanceStatus,
    /// Process variables
    #[serde(default)]
    pub variables: Values,
    /// Keys of the nodes currently waiting on tasks
    #[serde(default)]
    pub current_node_keys: Vec<String>,
    /// Every node key visited, in order
    #[serde(default)]
    pub execution_path: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Identity of the user who started the instance
    pub initiator: String,
}

/// Submitted form values, fetched by ID for condition evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormData {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Uuid>,
    #[serde(default)]
    pub business_key: String,
    pub values: Values,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Request to start an instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    pub definition_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub business_key: String,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub business_data: Value,
    /// Initial form values, evaluated by CONDITION nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<Values>,
    /// Seed process variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Values>,
}

/// Filter for instance listings
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    /// Only instances started by this user
    pub initiator: Option<String>,
    /// Only instances in this status
    pub status: Option<InstanceStatus>,
    /// Instances this user started or holds a task on
    pub involving: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_status_serialization() {
        let json = serde_json::to_string(&InstanceStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!("suspended".parse::<InstanceStatus>(), Ok(InstanceStatus::Suspended));
    }

    #[test]
    fn test_lifecycle_transitions() {
        use InstanceStatus::*;
        assert!(Draft.can_transition_to(Running));
        assert!(Running.can_transition_to(Approved));
        assert!(Running.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Running));
        assert!(!Suspended.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Running));
        assert!(!Cancelled.can_transition_to(Running));
        assert!(!Draft.can_transition_to(Approved));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(InstanceStatus::Approved.is_terminal());
        assert!(InstanceStatus::Rejected.is_terminal());
        assert!(InstanceStatus::Cancelled.is_terminal());
        assert!(!InstanceStatus::Running.is_terminal());
        assert!(!InstanceStatus::Suspended.is_terminal());
    }
}
