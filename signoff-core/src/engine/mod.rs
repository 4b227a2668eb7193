//! Workflow execution engine
//!
//! [`WorkflowEngine`] holds the collaborators (identity directory, task
//! defaults, parsed-tree cache). The store is passed explicitly into every
//! operation, and each operation runs as one store transaction.

pub mod assignee;
pub mod completion;
pub mod condition;
mod definitions;
mod executor;
mod history;
mod instances;
mod queries;
mod tasks;

pub use assignee::{resolve, Directory, StaticDirectory};
pub use completion::{outcome, Outcome};
pub use definitions::DocumentFormat;
pub use queries::Statistics;

use crate::error::EngineResult;
use crate::models::configuration::Configuration;
use crate::models::definition::ProcessDefinition;
use crate::tree::NodeTree;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Defaults applied to newly created tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_task_priority: i32,
    /// When set, tasks are due this many hours after creation
    pub default_due_hours: Option<u32>,
}

impl From<&Configuration> for EngineSettings {
    fn from(config: &Configuration) -> Self {
        Self {
            default_task_priority: config.default_task_priority,
            default_due_hours: config.default_due_hours,
        }
    }
}

/// Approval workflow engine
pub struct WorkflowEngine {
    directory: Arc<dyn Directory>,
    settings: EngineSettings,
    /// Parsed trees by definition ID; definitions never change their tree
    trees: DashMap<Uuid, Arc<NodeTree>>,
}

impl WorkflowEngine {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            settings: EngineSettings::default(),
            trees: DashMap::new(),
        }
    }

    /// Engine with a [`StaticDirectory`] and task defaults taken from configuration
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(Arc::new(StaticDirectory::from(&config.directory)))
            .with_settings(EngineSettings::from(config))
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Parsed tree of a definition, served from the cache after the first parse
    fn tree_for(&self, definition: &ProcessDefinition) -> EngineResult<Arc<NodeTree>> {
        if let Some(tree) = self.trees.get(&definition.id) {
            return Ok(Arc::clone(tree.value()));
        }
        let tree = Arc::new(NodeTree::parse(&definition.tree)?);
        self.trees.insert(definition.id, Arc::clone(&tree));
        Ok(tree)
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("settings", &self.settings)
            .field("cached_trees", &self.trees.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::configuration::DirectoryConfig;

    #[test]
    fn test_from_config() {
        let mut directory = DirectoryConfig::default();
        directory
            .roles
            .insert("clerks".to_string(), vec!["c1".to_string()]);
        let config = Configuration {
            default_task_priority: 3,
            default_due_hours: Some(24),
            directory,
            ..Configuration::default()
        };

        let engine = WorkflowEngine::from_config(&config);
        assert_eq!(engine.settings().default_task_priority, 3);
        assert_eq!(engine.settings().default_due_hours, Some(24));
        assert_eq!(
            engine.directory.users_in_roles(&["clerks".to_string()]).unwrap(),
            vec!["c1".to_string()]
        );
    }
}
