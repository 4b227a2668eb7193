//! Engine error taxonomy
//!
//! Every failure carries the subject it refers to (definition, instance, task or
//! node key) so callers can decide between retrying and escalating.

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any mutation
    Validation,
    /// Wrong definition/instance/task status for the requested action
    StateConflict,
    /// Actor is not allowed to act on the subject
    Authorization,
    /// No assignees could be resolved for a node activation
    Resolution,
    /// The store or another collaborator failed; nothing was persisted
    Store,
    /// Referenced entity does not exist
    NotFound,
}

impl ErrorKind {
    /// Only store failures are safe to retry blindly
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Store)
    }
}

/// Errors surfaced by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed node tree: {0}")]
    MalformedTree(String),

    #[error("Duplicate node key '{0}' in definition")]
    DuplicateNodeKey(String),

    #[error("Invalid definition: {}", .0.join("; "))]
    InvalidDefinition(Vec<String>),

    #[error("Definition {0} not found")]
    DefinitionNotFound(Uuid),

    #[error("Definition {id} is {status}, only active definitions can be started")]
    DefinitionNotActive { id: Uuid, status: String },

    #[error("Instance {0} not found")]
    InstanceNotFound(Uuid),

    #[error("Instance {id} cannot move from {from} to {to}")]
    InvalidStateTransition { id: Uuid, from: String, to: String },

    #[error("Instance {id} is {status}, tasks can only be resolved while running")]
    InstanceNotRunning { id: Uuid, status: String },

    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Task {task_id} is already {status}")]
    TaskAlreadyResolved { task_id: Uuid, status: String },

    #[error("User '{actor}' is not the assignee of task {task_id}")]
    NotAssignee { task_id: Uuid, actor: String },

    #[error("Node '{node_key}' is not active on instance {instance_id}")]
    NodeNotActive { instance_id: Uuid, node_key: String },

    #[error("Node '{node_key}' not found in definition {definition_id}")]
    NodeNotFound { definition_id: Uuid, node_key: String },

    #[error("Node '{node_key}' has type {node_type}, which the interpreter does not execute")]
    UnsupportedNodeType { node_key: String, node_type: String },

    #[error("No assignees resolved for node '{node_key}' on instance {instance_id}")]
    NoAssignees { instance_id: Uuid, node_key: String },

    #[error("Store failure: {0}")]
    Store(String),
}

impl EngineError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::MalformedTree(_)
            | EngineError::DuplicateNodeKey(_)
            | EngineError::InvalidDefinition(_) => ErrorKind::Validation,
            EngineError::DefinitionNotActive { .. }
            | EngineError::InvalidStateTransition { .. }
            | EngineError::InstanceNotRunning { .. }
            | EngineError::TaskAlreadyResolved { .. }
            | EngineError::NodeNotActive { .. }
            | EngineError::UnsupportedNodeType { .. } => ErrorKind::StateConflict,
            EngineError::NotAssignee { .. } => ErrorKind::Authorization,
            EngineError::NoAssignees { .. } => ErrorKind::Resolution,
            EngineError::Store(_) => ErrorKind::Store,
            EngineError::DefinitionNotFound(_)
            | EngineError::InstanceNotFound(_)
            | EngineError::TaskNotFound(_)
            | EngineError::NodeNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::MalformedTree(err.to_string())
    }
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
