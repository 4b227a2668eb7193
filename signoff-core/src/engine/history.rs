//! History recorder: append-only audit entries written inside the caller's transaction

use crate::error::EngineResult;
use crate::models::history::{HistoryAction, HistoryEntry};
use crate::models::instance::Values;
use crate::store::StoreState;
use chrono::Utc;
use uuid::Uuid;

/// One entry to append
#[derive(Debug)]
pub(crate) struct Record<'a> {
    pub action: HistoryAction,
    pub operator: &'a str,
    pub node_key: &'a str,
    pub node_name: &'a str,
    pub comment: &'a str,
    pub form_values: Option<&'a Values>,
}

impl<'a> Record<'a> {
    pub fn new(action: HistoryAction, operator: &'a str) -> Self {
        Self {
            action,
            operator,
            node_key: "",
            node_name: "",
            comment: "",
            form_values: None,
        }
    }

    pub fn at(mut self, node_key: &'a str, node_name: &'a str) -> Self {
        self.node_key = node_key;
        self.node_name = node_name;
        self
    }

    pub fn comment(mut self, comment: &'a str) -> Self {
        self.comment = comment;
        self
    }

    pub fn form_values(mut self, values: Option<&'a Values>) -> Self {
        self.form_values = values;
        self
    }
}

/// Append an entry, snapshotting the instance's current variables
pub(crate) fn append(state: &mut StoreState, instance_id: Uuid, record: Record<'_>) -> EngineResult<()> {
    let variables = state.instance(instance_id)?.variables.clone();
    let sequence = state.next_sequence();

    tracing::debug!(
        instance_id = %instance_id,
        action = %record.action,
        node_key = record.node_key,
        sequence = sequence,
        "Recording history"
    );

    state.history.push(HistoryEntry {
        id: Uuid::new_v4(),
        sequence,
        instance_id,
        node_key: record.node_key.to_string(),
        node_name: record.node_name.to_string(),
        action: record.action,
        operator: record.operator.to_string(),
        comment: record.comment.to_string(),
        form_values: record.form_values.cloned(),
        variables,
        created_at: Utc::now(),
    });
    Ok(())
}
