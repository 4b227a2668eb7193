//! Transactional workflow store
//!
//! All tables live in one [`StoreState`] document. [`WorkflowStore::transaction`]
//! runs a closure against a working copy while holding the store mutex; the copy
//! replaces the committed state only when the closure succeeds and, for a
//! file-backed store, the document has been written.
//!
//! A file-backed store may be shared with other processes. Each transaction
//! holds the exclusive file lock from re-loading the document until its write
//! lands, and each read re-loads under the shared lock, so the in-memory copy
//! is only a cache of the last document seen.

pub mod persistence;

use crate::error::{EngineError, EngineResult};
use crate::models::definition::{BranchRecord, NodeRecord, ProcessDefinition};
use crate::models::history::HistoryEntry;
use crate::models::instance::{FormData, WorkflowInstance};
use crate::models::task::WorkflowTask;
use anyhow::{Context, Result};
use persistence::StoreLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Root document containing every table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreState {
    #[serde(default)]
    pub definitions: Vec<ProcessDefinition>,
    /// Flattened node records of every definition
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Flattened branch records of every definition
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    #[serde(default)]
    pub instances: Vec<WorkflowInstance>,
    #[serde(default)]
    pub tasks: Vec<WorkflowTask>,
    /// Append-only audit trail, in insertion order
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub form_data: Vec<FormData>,
    /// Last history sequence number handed out
    #[serde(default)]
    pub last_sequence: u64,
}

impl StoreState {
    pub fn definition(&self, id: Uuid) -> EngineResult<&ProcessDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or(EngineError::DefinitionNotFound(id))
    }

    pub fn definition_mut(&mut self, id: Uuid) -> EngineResult<&mut ProcessDefinition> {
        self.definitions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(EngineError::DefinitionNotFound(id))
    }

    /// Flattened record of one node, by its join key
    pub fn node_record(&self, workflow_id: Uuid, node_key: &str) -> EngineResult<&NodeRecord> {
        self.nodes
            .iter()
            .find(|n| n.workflow_id == workflow_id && n.node_key == node_key)
            .ok_or_else(|| EngineError::NodeNotFound {
                definition_id: workflow_id,
                node_key: node_key.to_string(),
            })
    }

    /// Node records of a definition in depth-first order
    pub fn node_records(&self, workflow_id: Uuid) -> Vec<&NodeRecord> {
        let mut records: Vec<&NodeRecord> = self
            .nodes
            .iter()
            .filter(|n| n.workflow_id == workflow_id)
            .collect();
        records.sort_by_key(|n| n.sort_order);
        records
    }

    /// Branch records of a definition, grouped by owning node in declaration order
    pub fn branch_records(&self, workflow_id: Uuid) -> Vec<&BranchRecord> {
        self.branches
            .iter()
            .filter(|b| b.workflow_id == workflow_id)
            .collect()
    }

    pub fn instance(&self, id: Uuid) -> EngineResult<&WorkflowInstance> {
        self.instances
            .iter()
            .find(|i| i.id == id)
            .ok_or(EngineError::InstanceNotFound(id))
    }

    pub fn instance_mut(&mut self, id: Uuid) -> EngineResult<&mut WorkflowInstance> {
        self.instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(EngineError::InstanceNotFound(id))
    }

    pub fn task(&self, id: Uuid) -> EngineResult<&WorkflowTask> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(EngineError::TaskNotFound(id))
    }

    pub fn task_mut(&mut self, id: Uuid) -> EngineResult<&mut WorkflowTask> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(EngineError::TaskNotFound(id))
    }

    /// Every task sharing `(instance, node_key)`
    pub fn tasks_for_node<'a>(
        &'a self,
        instance_id: Uuid,
        node_key: &'a str,
    ) -> impl Iterator<Item = &'a WorkflowTask> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.instance_id == instance_id && t.node_key == node_key)
    }

    pub fn form_data(&self, id: Uuid) -> Option<&FormData> {
        self.form_data.iter().find(|f| f.id == id)
    }

    /// Hand out the next history sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.last_sequence += 1;
        self.last_sequence
    }
}

/// Shared handle to the workflow store
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    state: Arc<Mutex<StoreState>>,
    /// Backing file; `None` for a volatile store
    path: Option<Arc<PathBuf>>,
}

impl WorkflowStore {
    /// Volatile store, lost when the last handle is dropped
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            path: None,
        }
    }

    /// Open a file-backed store, creating its directory when needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create workflow store directory")?;
        }

        let state = {
            let _lock = StoreLock::shared(&path)?;
            persistence::load_or_default(&path)?
        };

        tracing::debug!(path = %path.display(), instances = state.instances.len(), "Opened workflow store");

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            path: Some(Arc::new(path)),
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::Store("workflow store mutex poisoned".to_string()))
    }

    /// Run `f` as one atomic unit.
    ///
    /// `Ok` commits every change `f` made; `Err` discards all of them. Concurrent
    /// transactions on clones of this handle, and on other handles of the same
    /// file, are serialized.
    pub fn transaction<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut StoreState) -> EngineResult<T>,
    {
        let mut committed = self.lock()?;

        let Some(path) = &self.path else {
            let mut working = committed.clone();
            let value = f(&mut working)?;
            *committed = working;
            return Ok(value);
        };

        let _lock = StoreLock::exclusive(path).map_err(store_error)?;
        let mut working = persistence::load_or_default(path).map_err(store_error)?;

        let value = f(&mut working)?;

        persistence::save_state(path, &working).map_err(store_error)?;
        *committed = working;
        Ok(value)
    }

    /// Read a consistent view of the committed state
    pub fn read<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&StoreState) -> T,
    {
        let mut state = self.lock()?;
        if let Some(path) = &self.path {
            let _lock = StoreLock::shared(path).map_err(store_error)?;
            *state = persistence::load_or_default(path).map_err(store_error)?;
        }
        Ok(f(&state))
    }
}

fn store_error(e: anyhow::Error) -> EngineError {
    EngineError::Store(format!("{:#}", e))
}
