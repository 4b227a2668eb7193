//! Instance lifecycle: start, cancel, suspend and resume

use super::executor::{Advance, Executor};
use super::history::{self, Record};
use super::WorkflowEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::definition::DefinitionStatus;
use crate::models::history::HistoryAction;
use crate::models::instance::{FormData, InstanceStatus, StartRequest, WorkflowInstance};
use crate::services::logging::log_operation_failure;
use crate::store::{StoreState, WorkflowStore};
use chrono::Utc;
use uuid::Uuid;

/// Move an instance to `to`, rejecting transitions the lifecycle forbids
fn transition(
    state: &mut StoreState,
    id: Uuid,
    to: InstanceStatus,
) -> EngineResult<&mut WorkflowInstance> {
    let instance = state.instance_mut(id)?;
    if !instance.status.can_transition_to(to) {
        return Err(EngineError::InvalidStateTransition {
            id,
            from: instance.status.to_string(),
            to: to.to_string(),
        });
    }
    instance.status = to;
    if to.is_terminal() {
        instance.ended_at = Some(Utc::now());
    }
    Ok(instance)
}

impl WorkflowEngine {
    /// Start an instance of an active definition and run it to its first suspension point.
    ///
    /// When the first APPROVAL node reached resolves no assignees, the instance
    /// is still created (running, no active node) and `NoAssignees` is returned.
    pub fn start(
        &self,
        store: &WorkflowStore,
        request: StartRequest,
        initiator: &str,
    ) -> EngineResult<WorkflowInstance> {
        let definition_id = request.definition_id;
        let (instance, advance) = store
            .transaction(|state| {
                let definition = state.definition(definition_id)?;
                if definition.status != DefinitionStatus::Active {
                    return Err(EngineError::DefinitionNotActive {
                        id: definition_id,
                        status: definition.status.to_string(),
                    });
                }
                let tree = self.tree_for(definition)?;
                let now = Utc::now();

                let form_data_id = match &request.form_values {
                    Some(values) => {
                        let form = FormData {
                            id: Uuid::new_v4(),
                            form_id: definition.form_id,
                            business_key: request.business_key.clone(),
                            values: values.clone(),
                            created_by: initiator.to_string(),
                            created_at: now,
                        };
                        let id = form.id;
                        state.form_data.push(form);
                        Some(id)
                    }
                    None => None,
                };

                let instance_id = Uuid::new_v4();
                state.instances.push(WorkflowInstance {
                    id: instance_id,
                    definition_id,
                    title: request.title.clone(),
                    business_key: request.business_key.clone(),
                    business_type: request.business_type.clone(),
                    business_data: request.business_data.clone(),
                    form_data_id,
                    status: InstanceStatus::Draft,
                    variables: request.variables.clone().unwrap_or_default(),
                    current_node_keys: Vec::new(),
                    execution_path: Vec::new(),
                    started_at: now,
                    ended_at: None,
                    initiator: initiator.to_string(),
                });
                transition(state, instance_id, InstanceStatus::Running)?;

                history::append(
                    state,
                    instance_id,
                    Record::new(HistoryAction::Started, initiator)
                        .form_values(request.form_values.as_ref()),
                )?;
                tracing::info!(
                    instance_id = %instance_id,
                    definition_id = %definition_id,
                    initiator = initiator,
                    "Instance started"
                );

                let root = tree.root().key.clone();
                let mut executor = Executor {
                    state: &mut *state,
                    tree: tree.as_ref(),
                    directory: self.directory.as_ref(),
                    settings: &self.settings,
                    instance_id,
                    operator: initiator,
                };
                let advance = executor.run(&root)?;

                Ok((state.instance(instance_id)?.clone(), advance))
            })
            .inspect_err(|e| {
                log_operation_failure("start", &definition_id.to_string(), &e.to_string())
            })?;

        match advance {
            Advance::Waiting { node_key, tasks } => tracing::debug!(
                instance_id = %instance.id,
                node_key = %node_key,
                tasks = tasks.len(),
                "Start suspended at approval node"
            ),
            Advance::Finished => tracing::debug!(instance_id = %instance.id, "Start ran to END"),
            Advance::Halted { node_key } => tracing::debug!(
                instance_id = %instance.id,
                node_key = %node_key,
                "Start halted"
            ),
            Advance::Unassigned { node_key } => {
                return Err(EngineError::NoAssignees {
                    instance_id: instance.id,
                    node_key,
                })
            }
        }
        Ok(instance)
    }

    /// Cancel a running instance. Its pending tasks are left untouched.
    pub fn cancel(
        &self,
        store: &WorkflowStore,
        instance_id: Uuid,
        operator: &str,
        comment: &str,
    ) -> EngineResult<WorkflowInstance> {
        self.change_status(
            store,
            instance_id,
            InstanceStatus::Cancelled,
            Record::new(HistoryAction::Cancelled, operator).comment(comment),
        )
    }

    /// Administratively pause a running instance
    pub fn suspend(
        &self,
        store: &WorkflowStore,
        instance_id: Uuid,
        operator: &str,
        comment: &str,
    ) -> EngineResult<WorkflowInstance> {
        self.change_status(
            store,
            instance_id,
            InstanceStatus::Suspended,
            Record::new(HistoryAction::Suspended, operator).comment(comment),
        )
    }

    /// Return a suspended instance to running
    pub fn resume(
        &self,
        store: &WorkflowStore,
        instance_id: Uuid,
        operator: &str,
        comment: &str,
    ) -> EngineResult<WorkflowInstance> {
        self.change_status(
            store,
            instance_id,
            InstanceStatus::Running,
            Record::new(HistoryAction::Resumed, operator).comment(comment),
        )
    }

    fn change_status(
        &self,
        store: &WorkflowStore,
        instance_id: Uuid,
        to: InstanceStatus,
        record: Record<'_>,
    ) -> EngineResult<WorkflowInstance> {
        let action = record.action;
        store
            .transaction(|state| {
                let instance = transition(state, instance_id, to)?.clone();
                history::append(state, instance_id, record)?;
                tracing::info!(
                    instance_id = %instance_id,
                    status = %to,
                    "Instance status changed"
                );
                Ok(instance)
            })
            .inspect_err(|e| {
                log_operation_failure(&action.to_string(), &instance_id.to_string(), &e.to_string())
            })
    }
}
