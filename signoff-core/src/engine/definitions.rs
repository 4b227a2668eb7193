//! Definition management: create, import, status changes and re-versioning

use super::WorkflowEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::definition::{
    BranchRecord, CreateDefinitionRequest, DefinitionStatus, NodeRecord, ProcessDefinition,
};
use crate::store::{StoreState, WorkflowStore};
use crate::tree::{flatten, NodeData, NodeTree, TreeValidator};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Encoding of an imported definition document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Guess from a file extension; anything other than `.yaml`/`.yml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Parse and validate a tree, returning its arena form
fn checked_tree(request: &CreateDefinitionRequest) -> EngineResult<NodeTree> {
    let tree = NodeTree::from_data(&request.node_tree)?;

    let mut validation = TreeValidator::validate(&request.node_tree);
    if request.name.trim().is_empty() {
        validation.add_error("name".to_string(), "Definition name cannot be empty".to_string());
    }
    if !validation.is_valid() {
        return Err(EngineError::InvalidDefinition(validation.error_messages()));
    }
    for warning in &validation.warnings {
        tracing::warn!(definition = %request.name, "{}", warning);
    }
    Ok(tree)
}

/// Store a definition and its flattened records in one transaction
fn insert_definition(state: &mut StoreState, definition: ProcessDefinition, tree: &NodeTree) {
    let (nodes, branches) = flatten(definition.id, tree);
    state.nodes.extend(nodes);
    state.branches.extend(branches);
    state.definitions.push(definition);
}

impl WorkflowEngine {
    /// Create a draft definition (version 1) from a nested node tree
    pub fn create_definition(
        &self,
        store: &WorkflowStore,
        request: CreateDefinitionRequest,
        creator: &str,
    ) -> EngineResult<ProcessDefinition> {
        let tree = checked_tree(&request)?;
        let now = Utc::now();
        let definition = ProcessDefinition {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            category: request.category,
            version: 1,
            status: DefinitionStatus::Draft,
            form_id: request.form_id,
            tree: tree.serialize()?,
            created_by: creator.to_string(),
            created_at: now,
            updated_at: now,
        };

        store.transaction(|state| {
            insert_definition(state, definition.clone(), &tree);
            Ok(())
        })?;
        self.trees.insert(definition.id, Arc::new(tree));

        tracing::info!(
            definition_id = %definition.id,
            name = %definition.name,
            "Definition created"
        );
        Ok(definition)
    }

    /// Create a definition from a JSON or YAML document shaped like [`CreateDefinitionRequest`]
    pub fn import_definition(
        &self,
        store: &WorkflowStore,
        raw: &str,
        format: DocumentFormat,
        creator: &str,
    ) -> EngineResult<ProcessDefinition> {
        let request: CreateDefinitionRequest = match format {
            DocumentFormat::Json => serde_json::from_str(raw)?,
            DocumentFormat::Yaml => serde_yaml::from_str(raw)
                .map_err(|e| EngineError::MalformedTree(e.to_string()))?,
        };
        self.create_definition(store, request, creator)
    }

    /// Change a definition's lifecycle status; the tree itself never changes
    pub fn set_definition_status(
        &self,
        store: &WorkflowStore,
        id: Uuid,
        status: DefinitionStatus,
    ) -> EngineResult<ProcessDefinition> {
        store.transaction(|state| {
            let definition = state.definition_mut(id)?;
            let previous = definition.status;
            definition.status = status;
            definition.updated_at = Utc::now();
            tracing::info!(
                definition_id = %id,
                from = %previous,
                to = %status,
                "Definition status changed"
            );
            Ok(definition.clone())
        })
    }

    /// Re-version a definition with a new tree: a new draft with the next version number
    pub fn new_version(
        &self,
        store: &WorkflowStore,
        id: Uuid,
        node_tree: NodeData,
        creator: &str,
    ) -> EngineResult<ProcessDefinition> {
        let source = store.read(|state| state.definition(id).cloned())??;
        let request = CreateDefinitionRequest {
            name: source.name.clone(),
            description: source.description.clone(),
            category: source.category.clone(),
            form_id: source.form_id,
            node_tree,
        };
        let tree = checked_tree(&request)?;
        let raw = tree.serialize()?;

        let definition = store.transaction(|state| {
            let version = state
                .definitions
                .iter()
                .filter(|d| d.name == source.name && d.category == source.category)
                .map(|d| d.version)
                .max()
                .unwrap_or(source.version)
                + 1;
            let now = Utc::now();
            let definition = ProcessDefinition {
                id: Uuid::new_v4(),
                name: request.name.clone(),
                description: request.description.clone(),
                category: request.category.clone(),
                version,
                status: DefinitionStatus::Draft,
                form_id: request.form_id,
                tree: raw.clone(),
                created_by: creator.to_string(),
                created_at: now,
                updated_at: now,
            };
            insert_definition(state, definition.clone(), &tree);
            Ok(definition)
        })?;
        self.trees.insert(definition.id, Arc::new(tree));

        tracing::info!(
            definition_id = %definition.id,
            previous_id = %id,
            version = definition.version,
            "Definition re-versioned"
        );
        Ok(definition)
    }

    /// Definitions ordered by name then version, optionally filtered by status
    pub fn list_definitions(
        &self,
        store: &WorkflowStore,
        status: Option<DefinitionStatus>,
    ) -> EngineResult<Vec<ProcessDefinition>> {
        store.read(|state| {
            let mut definitions: Vec<ProcessDefinition> = state
                .definitions
                .iter()
                .filter(|d| status.map_or(true, |s| d.status == s))
                .cloned()
                .collect();
            definitions.sort_by(|a, b| a.name.cmp(&b.name).then(a.version.cmp(&b.version)));
            definitions
        })
    }

    pub fn get_definition(&self, store: &WorkflowStore, id: Uuid) -> EngineResult<ProcessDefinition> {
        store.read(|state| state.definition(id).cloned())?
    }

    /// Parsed node tree of a definition
    pub fn definition_tree(&self, store: &WorkflowStore, id: Uuid) -> EngineResult<Arc<NodeTree>> {
        let definition = self.get_definition(store, id)?;
        self.tree_for(&definition)
    }

    /// Flattened node and branch records of a definition
    pub fn definition_records(
        &self,
        store: &WorkflowStore,
        id: Uuid,
    ) -> EngineResult<(Vec<NodeRecord>, Vec<BranchRecord>)> {
        store.read(|state| -> EngineResult<(Vec<NodeRecord>, Vec<BranchRecord>)> {
            state.definition(id)?;
            let nodes = state.node_records(id).into_iter().cloned().collect();
            let branches = state.branch_records(id).into_iter().cloned().collect();
            Ok((nodes, branches))
        })?
    }
}
