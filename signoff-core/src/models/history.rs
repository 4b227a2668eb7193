//! Audit history data models

use crate::models::instance::Values;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Action recorded by a history entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Instance started
    Started,
    /// A task was approved
    Approved,
    /// A task was rejected, vetoing the instance
    Rejected,
    /// Instance reached an END node
    Completed,
    /// Instance cancelled by an operator
    Cancelled,
    /// Instance paused
    Suspended,
    /// Instance resumed after a pause
    Resumed,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HistoryAction::Started => "started",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Completed => "completed",
            HistoryAction::Cancelled => "cancelled",
            HistoryAction::Suspended => "suspended",
            HistoryAction::Resumed => "resumed",
        };
        f.write_str(name)
    }
}

/// Immutable audit record of one transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Store-wide insertion counter, breaks timestamp ties
    pub sequence: u64,
    pub instance_id: Uuid,
    /// Node the action happened on; empty for instance-level actions
    #[serde(default)]
    pub node_key: String,
    #[serde(default)]
    pub node_name: String,
    pub action: HistoryAction,
    /// Who performed the action
    pub operator: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<Values>,
    /// Process variables at the time of the action
    #[serde(default)]
    pub variables: Values,
    pub created_at: DateTime<Utc>,
}
