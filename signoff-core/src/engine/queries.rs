//! Read-only views over instances, tasks and history

use super::WorkflowEngine;
use crate::error::EngineResult;
use crate::models::definition::DefinitionStatus;
use crate::models::history::HistoryEntry;
use crate::models::instance::{InstanceFilter, WorkflowInstance};
use crate::models::task::{TaskStatus, WorkflowTask};
use crate::store::WorkflowStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Aggregate counts over the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub definition_count: usize,
    pub active_definition_count: usize,
    pub instance_count: usize,
    /// Instance count per status name
    pub instances_by_status: BTreeMap<String, usize>,
    /// Pending tasks, for one user when asked
    pub pending_task_count: usize,
}

impl WorkflowEngine {
    pub fn get_instance(&self, store: &WorkflowStore, id: Uuid) -> EngineResult<WorkflowInstance> {
        store.read(|state| state.instance(id).cloned())?
    }

    /// Instances matching the filter, newest first
    pub fn list_instances(
        &self,
        store: &WorkflowStore,
        filter: &InstanceFilter,
    ) -> EngineResult<Vec<WorkflowInstance>> {
        store.read(|state| {
            let mut instances: Vec<WorkflowInstance> = state
                .instances
                .iter()
                .filter(|i| filter.initiator.as_ref().map_or(true, |u| &i.initiator == u))
                .filter(|i| filter.status.map_or(true, |s| i.status == s))
                .filter(|i| {
                    filter.involving.as_ref().map_or(true, |user| {
                        &i.initiator == user
                            || state
                                .tasks
                                .iter()
                                .any(|t| t.instance_id == i.id && &t.assignee == user)
                    })
                })
                .cloned()
                .collect();
            instances.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            instances
        })
    }

    pub fn get_task(&self, store: &WorkflowStore, id: Uuid) -> EngineResult<WorkflowTask> {
        store.read(|state| state.task(id).cloned())?
    }

    /// A user's to-do list: pending tasks by priority (highest first), then age
    pub fn pending_tasks_for(&self, store: &WorkflowStore, user: &str) -> EngineResult<Vec<WorkflowTask>> {
        store.read(|state| {
            let mut tasks: Vec<WorkflowTask> = state
                .tasks
                .iter()
                .filter(|t| t.assignee == user && t.status == TaskStatus::Pending)
                .cloned()
                .collect();
            tasks.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
            });
            tasks
        })
    }

    /// Every task of an instance in creation order
    pub fn tasks_for_instance(
        &self,
        store: &WorkflowStore,
        instance_id: Uuid,
    ) -> EngineResult<Vec<WorkflowTask>> {
        store.read(|state| -> EngineResult<Vec<WorkflowTask>> {
            state.instance(instance_id)?;
            Ok(state
                .tasks
                .iter()
                .filter(|t| t.instance_id == instance_id)
                .cloned()
                .collect())
        })?
    }

    /// Audit trail of an instance, exactly in the order it was written
    pub fn history(&self, store: &WorkflowStore, instance_id: Uuid) -> EngineResult<Vec<HistoryEntry>> {
        store.read(|state| -> EngineResult<Vec<HistoryEntry>> {
            state.instance(instance_id)?;
            let mut entries: Vec<HistoryEntry> = state
                .history
                .iter()
                .filter(|h| h.instance_id == instance_id)
                .cloned()
                .collect();
            entries.sort_by_key(|h| h.sequence);
            Ok(entries)
        })?
    }

    /// Counts of definitions, instances and pending tasks
    pub fn statistics(&self, store: &WorkflowStore, user: Option<&str>) -> EngineResult<Statistics> {
        store.read(|state| {
            let mut instances_by_status = BTreeMap::new();
            for instance in &state.instances {
                *instances_by_status
                    .entry(instance.status.to_string())
                    .or_insert(0) += 1;
            }
            Statistics {
                definition_count: state.definitions.len(),
                active_definition_count: state
                    .definitions
                    .iter()
                    .filter(|d| d.status == DefinitionStatus::Active)
                    .count(),
                instance_count: state.instances.len(),
                instances_by_status,
                pending_task_count: state
                    .tasks
                    .iter()
                    .filter(|t| t.status == TaskStatus::Pending)
                    .filter(|t| user.map_or(true, |u| t.assignee == u))
                    .count(),
            }
        })
    }
}
