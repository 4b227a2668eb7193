//! # Signoff Core Library
//!
//! Approval-workflow execution engine: node-tree definitions, the interpreter
//! that walks them, task lifecycle and completion rules, assignee resolution,
//! the audit trail, and the transactional store they share.

pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod tree;

pub use engine::{Directory, EngineSettings, StaticDirectory, WorkflowEngine};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use store::WorkflowStore;
