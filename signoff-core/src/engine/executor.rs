//! Node tree interpreter
//!
//! Walks the tree from a position until it suspends at an APPROVAL node,
//! reaches END, or runs out of nodes. Everything happens inside the caller's
//! transaction; an `Err` rolls the whole walk back.

use super::assignee::{resolve, Directory};
use super::condition::{Expr, Scope};
use super::history::{self, Record};
use super::tasks::create_task;
use super::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::history::HistoryAction;
use crate::models::instance::InstanceStatus;
use crate::store::StoreState;
use crate::tree::{ApprovalMode, Branch, NodeTree, NodeType, TreeNode};
use chrono::Utc;
use uuid::Uuid;

/// Where a walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Advance {
    /// Suspended at an APPROVAL node with freshly created tasks
    Waiting { node_key: String, tasks: Vec<Uuid> },
    /// END reached; the instance is approved
    Finished,
    /// No node left to visit; the instance keeps running with no active node
    Halted { node_key: String },
    /// An APPROVAL node resolved no assignees; the activation was aborted
    Unassigned { node_key: String },
}

impl Advance {
    /// The error to surface once the enclosing transaction has committed
    pub fn into_error(self, instance_id: Uuid) -> Option<EngineError> {
        match self {
            Advance::Unassigned { node_key } => Some(EngineError::NoAssignees {
                instance_id,
                node_key,
            }),
            _ => None,
        }
    }
}

pub(crate) struct Executor<'a> {
    pub state: &'a mut StoreState,
    pub tree: &'a NodeTree,
    pub directory: &'a dyn Directory,
    pub settings: &'a EngineSettings,
    pub instance_id: Uuid,
    /// Identity credited with transitions the walk causes
    pub operator: &'a str,
}

impl<'a> Executor<'a> {
    /// Execute the node with the given key and whatever follows it
    pub fn run(&mut self, key: &str) -> EngineResult<Advance> {
        let tree = self.tree;
        match tree.node(key) {
            Some(node) => self.visit(node),
            None => Err(EngineError::NodeNotFound {
                definition_id: self.definition_id()?,
                node_key: key.to_string(),
            }),
        }
    }

    /// Resume after `key` completed: execute its child, or halt at a leaf
    pub fn resume_after(&mut self, key: &str) -> EngineResult<Advance> {
        let tree = self.tree;
        match tree.child_of(key) {
            Some(next) => self.visit(next),
            None => self.halt(key),
        }
    }

    fn definition_id(&self) -> EngineResult<Uuid> {
        self.state
            .instance(self.instance_id)
            .map(|i| i.definition_id)
    }

    fn visit(&mut self, node: &'a TreeNode) -> EngineResult<Advance> {
        tracing::debug!(
            instance_id = %self.instance_id,
            node_key = %node.key,
            node_type = %node.node_type,
            "Visiting node"
        );
        self.state
            .instance_mut(self.instance_id)?
            .execution_path
            .push(node.key.clone());

        match node.node_type {
            NodeType::Root | NodeType::Start => match &node.child {
                Some(child) => self.run(child),
                None => self.halt(&node.key),
            },
            NodeType::End => self.finish(node),
            NodeType::Approval => self.activate(node),
            NodeType::Condition => self.branch(node),
            NodeType::Parallel | NodeType::Merge => Err(EngineError::UnsupportedNodeType {
                node_key: node.key.clone(),
                node_type: node.node_type.to_string(),
            }),
        }
    }

    fn finish(&mut self, node: &'a TreeNode) -> EngineResult<Advance> {
        let instance = self.state.instance_mut(self.instance_id)?;
        if !instance.status.can_transition_to(InstanceStatus::Approved) {
            return Err(EngineError::InvalidStateTransition {
                id: instance.id,
                from: instance.status.to_string(),
                to: InstanceStatus::Approved.to_string(),
            });
        }
        instance.status = InstanceStatus::Approved;
        instance.ended_at = Some(Utc::now());
        instance.current_node_keys.clear();

        history::append(
            self.state,
            self.instance_id,
            Record::new(HistoryAction::Completed, self.operator).at(&node.key, &node.name),
        )?;

        tracing::info!(instance_id = %self.instance_id, node_key = %node.key, "Instance approved");
        Ok(Advance::Finished)
    }

    fn activate(&mut self, node: &'a TreeNode) -> EngineResult<Advance> {
        let definition_id = self.definition_id()?;
        let record = self.state.node_record(definition_id, &node.key)?;
        let mode = record.approval_mode;
        let assignees = match &record.assignees {
            Some(spec) => resolve(self.directory, spec)?,
            None => Vec::new(),
        };

        if assignees.is_empty() {
            self.state
                .instance_mut(self.instance_id)?
                .current_node_keys
                .clear();
            tracing::warn!(
                instance_id = %self.instance_id,
                node_key = %node.key,
                "No assignees resolved; activation aborted"
            );
            return Ok(Advance::Unassigned {
                node_key: node.key.clone(),
            });
        }

        let targets = match mode {
            ApprovalMode::Sequence => &assignees[..1],
            ApprovalMode::Parallel | ApprovalMode::Any | ApprovalMode::All => &assignees[..],
        };

        let mut tasks = Vec::with_capacity(targets.len());
        for assignee in targets {
            tasks.push(create_task(
                self.state,
                self.instance_id,
                node,
                assignee,
                self.settings,
            )?);
        }

        self.state.instance_mut(self.instance_id)?.current_node_keys = vec![node.key.clone()];

        tracing::info!(
            instance_id = %self.instance_id,
            node_key = %node.key,
            approval_mode = %mode,
            tasks = tasks.len(),
            "Waiting for approval"
        );
        Ok(Advance::Waiting {
            node_key: node.key.clone(),
            tasks,
        })
    }

    fn branch(&mut self, node: &'a TreeNode) -> EngineResult<Advance> {
        let chosen = self.choose_branch(node)?;

        if let Some(branch) = chosen {
            tracing::debug!(
                instance_id = %self.instance_id,
                node_key = %node.key,
                branch_key = %branch.key,
                "Branch matched"
            );
            if let Some(child) = &branch.child {
                return self.run(child);
            }
        }

        match &node.child {
            Some(child) => self.run(child),
            None => {
                tracing::warn!(
                    instance_id = %self.instance_id,
                    node_key = %node.key,
                    "No branch matched and no default path"
                );
                self.halt(&node.key)
            }
        }
    }

    /// First branch, in declaration order, that has a child and whose condition holds
    fn choose_branch(&self, node: &'a TreeNode) -> EngineResult<Option<&'a Branch>> {
        let instance = self.state.instance(self.instance_id)?;
        let form = instance
            .form_data_id
            .and_then(|id| self.state.form_data(id))
            .map(|f| &f.values);
        let scope = Scope::new(form, &instance.variables);

        for branch in &node.branches {
            if branch.child.is_none() {
                continue;
            }
            if branch.branch_type != NodeType::Condition {
                return Ok(Some(branch));
            }
            match Expr::parse(&branch.condition) {
                Ok(expr) if expr.evaluate(&scope) => return Ok(Some(branch)),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    instance_id = %self.instance_id,
                    node_key = %node.key,
                    branch_key = %branch.key,
                    error = %e,
                    "Unparsable branch condition treated as not matching"
                ),
            }
        }
        Ok(None)
    }

    fn halt(&mut self, node_key: &str) -> EngineResult<Advance> {
        self.state
            .instance_mut(self.instance_id)?
            .current_node_keys
            .clear();
        tracing::warn!(
            instance_id = %self.instance_id,
            node_key = node_key,
            "Execution halted with no active node"
        );
        Ok(Advance::Halted {
            node_key: node_key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assignee::StaticDirectory;
    use crate::models::instance::WorkflowInstance;

    fn tree() -> NodeTree {
        NodeTree::parse(r#"{"key": "start", "name": "Start", "type": "START"}"#).unwrap()
    }

    fn instance(definition_id: Uuid) -> WorkflowInstance {
        WorkflowInstance {
            id: Uuid::new_v4(),
            definition_id,
            title: "t".to_string(),
            business_key: String::new(),
            business_type: String::new(),
            business_data: serde_json::Value::Null,
            form_data_id: None,
            status: InstanceStatus::Running,
            variables: Default::default(),
            current_node_keys: Vec::new(),
            execution_path: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            initiator: "alice".to_string(),
        }
    }

    #[test]
    fn test_unknown_key_names_the_definition() {
        let definition_id = Uuid::new_v4();
        let instance = instance(definition_id);
        let instance_id = instance.id;
        let mut state = StoreState::default();
        state.instances.push(instance);
        let tree = tree();
        let settings = EngineSettings::default();
        let directory = StaticDirectory::new();

        let mut executor = Executor {
            state: &mut state,
            tree: &tree,
            directory: &directory,
            settings: &settings,
            instance_id,
            operator: "alice",
        };
        let err = executor.run("missing").unwrap_err();
        assert!(matches!(
            err,
            EngineError::NodeNotFound { definition_id: d, ref node_key }
                if d == definition_id && node_key == "missing"
        ));
    }

    #[test]
    fn test_unknown_key_without_instance_is_instance_not_found() {
        let mut state = StoreState::default();
        let tree = tree();
        let settings = EngineSettings::default();
        let directory = StaticDirectory::new();
        let instance_id = Uuid::new_v4();

        let mut executor = Executor {
            state: &mut state,
            tree: &tree,
            directory: &directory,
            settings: &settings,
            instance_id,
            operator: "alice",
        };
        let err = executor.run("missing").unwrap_err();
        assert!(matches!(err, EngineError::InstanceNotFound(id) if id == instance_id));
    }
}
