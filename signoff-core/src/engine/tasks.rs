//! Task lifecycle: creation, approval and rejection

use super::completion::{outcome, Outcome};
use super::executor::Executor;
use super::history::{self, Record};
use super::{EngineSettings, WorkflowEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::history::HistoryAction;
use crate::models::instance::{InstanceStatus, Values};
use crate::models::task::{TaskStatus, WorkflowTask};
use crate::services::logging::log_operation_failure;
use crate::store::{StoreState, WorkflowStore};
use crate::tree::TreeNode;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Create one pending task for `assignee` on an APPROVAL node activation
pub(crate) fn create_task(
    state: &mut StoreState,
    instance_id: Uuid,
    node: &TreeNode,
    assignee: &str,
    settings: &EngineSettings,
) -> EngineResult<Uuid> {
    let instance = state.instance(instance_id)?;
    if instance.status.is_terminal() {
        return Err(EngineError::InstanceNotRunning {
            id: instance_id,
            status: instance.status.to_string(),
        });
    }

    let now = Utc::now();
    let task = WorkflowTask {
        id: Uuid::new_v4(),
        instance_id,
        node_key: node.key.clone(),
        node_name: node.name.clone(),
        assignee: assignee.to_string(),
        status: TaskStatus::Pending,
        comment: String::new(),
        form_values: None,
        created_at: now,
        processed_at: None,
        due_at: settings
            .default_due_hours
            .map(|hours| now + Duration::hours(i64::from(hours))),
        priority: settings.default_task_priority,
    };
    let id = task.id;

    tracing::debug!(
        instance_id = %instance_id,
        task_id = %id,
        node_key = %node.key,
        assignee = assignee,
        "Created task"
    );
    state.tasks.push(task);
    Ok(id)
}

/// Check that `actor` may resolve the task now; returns a copy of it
fn check_resolvable(state: &StoreState, task_id: Uuid, actor: &str) -> EngineResult<WorkflowTask> {
    let task = state.task(task_id)?;
    if task.assignee != actor {
        return Err(EngineError::NotAssignee {
            task_id,
            actor: actor.to_string(),
        });
    }
    if task.status.is_resolved() {
        return Err(EngineError::TaskAlreadyResolved {
            task_id,
            status: task.status.to_string(),
        });
    }

    let instance = state.instance(task.instance_id)?;
    if instance.status != InstanceStatus::Running {
        return Err(EngineError::InstanceNotRunning {
            id: instance.id,
            status: instance.status.to_string(),
        });
    }
    if !instance.current_node_keys.contains(&task.node_key) {
        return Err(EngineError::NodeNotActive {
            instance_id: instance.id,
            node_key: task.node_key.clone(),
        });
    }
    Ok(task.clone())
}

/// Mark a pending task resolved
fn resolve_task(
    state: &mut StoreState,
    task_id: Uuid,
    status: TaskStatus,
    comment: &str,
    form_values: Option<&Values>,
) -> EngineResult<WorkflowTask> {
    let task = state.task_mut(task_id)?;
    task.status = status;
    task.comment = comment.to_string();
    task.form_values = form_values.cloned();
    task.processed_at = Some(Utc::now());
    Ok(task.clone())
}

/// Drive the instance to `rejected`, freezing its current node keys
fn reject_instance(state: &mut StoreState, instance_id: Uuid) -> EngineResult<()> {
    let instance = state.instance_mut(instance_id)?;
    if !instance.status.can_transition_to(InstanceStatus::Rejected) {
        return Err(EngineError::InvalidStateTransition {
            id: instance_id,
            from: instance.status.to_string(),
            to: InstanceStatus::Rejected.to_string(),
        });
    }
    instance.status = InstanceStatus::Rejected;
    instance.ended_at = Some(Utc::now());
    Ok(())
}

impl WorkflowEngine {
    /// Approve a pending task.
    ///
    /// Submitted form values are kept on the task and merged into the
    /// instance's variables. When the node's approval mode is satisfied the
    /// interpreter resumes at the node's child within the same transaction.
    pub fn approve(
        &self,
        store: &WorkflowStore,
        task_id: Uuid,
        actor: &str,
        comment: &str,
        form_values: Option<Values>,
    ) -> EngineResult<WorkflowTask> {
        let (task, advance) = store
            .transaction(|state| {
                let pending = check_resolvable(state, task_id, actor)?;
                let instance_id = pending.instance_id;

                let task = resolve_task(
                    state,
                    task_id,
                    TaskStatus::Approved,
                    comment,
                    form_values.as_ref(),
                )?;
                if let Some(values) = &form_values {
                    let instance = state.instance_mut(instance_id)?;
                    for (name, value) in values {
                        instance.variables.insert(name.clone(), value.clone());
                    }
                }
                history::append(
                    state,
                    instance_id,
                    Record::new(HistoryAction::Approved, actor)
                        .at(&task.node_key, &task.node_name)
                        .comment(comment)
                        .form_values(form_values.as_ref()),
                )?;

                tracing::info!(
                    instance_id = %instance_id,
                    task_id = %task_id,
                    node_key = %task.node_key,
                    actor = actor,
                    "Task approved"
                );

                let definition_id = state.instance(instance_id)?.definition_id;
                let mode = state.node_record(definition_id, &task.node_key)?.approval_mode;
                let statuses: Vec<TaskStatus> = state
                    .tasks_for_node(instance_id, &task.node_key)
                    .map(|t| t.status)
                    .collect();

                let advance = match outcome(mode, &statuses) {
                    Outcome::Pending => None,
                    Outcome::Approved => {
                        state
                            .instance_mut(instance_id)?
                            .current_node_keys
                            .retain(|k| k != &task.node_key);
                        tracing::info!(
                            instance_id = %instance_id,
                            node_key = %task.node_key,
                            "Node completed"
                        );

                        let tree = self.tree_for(state.definition(definition_id)?)?;
                        let mut executor = Executor {
                            state: &mut *state,
                            tree: tree.as_ref(),
                            directory: self.directory.as_ref(),
                            settings: &self.settings,
                            instance_id,
                            operator: actor,
                        };
                        Some(executor.resume_after(&task.node_key)?)
                    }
                    Outcome::Rejected => {
                        reject_instance(state, instance_id)?;
                        None
                    }
                };
                Ok((task, advance))
            })
            .inspect_err(|e| log_operation_failure("approve", &task_id.to_string(), &e.to_string()))?;

        match advance.and_then(|a| a.into_error(task.instance_id)) {
            Some(err) => Err(err),
            None => Ok(task),
        }
    }

    /// Reject a pending task; a single rejection vetoes the whole instance
    pub fn reject(
        &self,
        store: &WorkflowStore,
        task_id: Uuid,
        actor: &str,
        comment: &str,
    ) -> EngineResult<WorkflowTask> {
        store
            .transaction(|state| {
                let pending = check_resolvable(state, task_id, actor)?;
                let instance_id = pending.instance_id;

                let task = resolve_task(state, task_id, TaskStatus::Rejected, comment, None)?;
                history::append(
                    state,
                    instance_id,
                    Record::new(HistoryAction::Rejected, actor)
                        .at(&task.node_key, &task.node_name)
                        .comment(comment),
                )?;
                reject_instance(state, instance_id)?;

                tracing::warn!(
                    instance_id = %instance_id,
                    task_id = %task_id,
                    node_key = %task.node_key,
                    actor = actor,
                    "Task rejected; instance rejected"
                );
                Ok(task)
            })
            .inspect_err(|e| log_operation_failure("reject", &task_id.to_string(), &e.to_string()))
    }
}
