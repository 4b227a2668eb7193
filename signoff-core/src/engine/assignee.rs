//! Assignee resolution
//!
//! Turns an [`AssigneeSpec`] into a concrete, order-preserving list of user IDs.

use crate::error::{EngineError, EngineResult};
use crate::models::configuration::DirectoryConfig;
use crate::tree::AssigneeSpec;
use std::collections::{BTreeMap, HashSet};

/// Identity collaborator: role and department membership lookups
pub trait Directory: Send + Sync {
    /// Users holding any of the given roles
    fn users_in_roles(&self, roles: &[String]) -> anyhow::Result<Vec<String>>;

    /// Users belonging to any of the given departments
    fn users_in_departments(&self, departments: &[String]) -> anyhow::Result<Vec<String>>;
}

/// In-memory directory backed by static membership tables
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    roles: BTreeMap<String, Vec<String>>,
    departments: BTreeMap<String, Vec<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add users to a role
    pub fn with_role<I, S>(mut self, role: &str, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.to_string())
            .or_default()
            .extend(users.into_iter().map(Into::into));
        self
    }

    /// Add users to a department
    pub fn with_department<I, S>(mut self, department: &str, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.departments
            .entry(department.to_string())
            .or_default()
            .extend(users.into_iter().map(Into::into));
        self
    }

    fn members(table: &BTreeMap<String, Vec<String>>, groups: &[String]) -> Vec<String> {
        groups
            .iter()
            .filter_map(|g| table.get(g))
            .flatten()
            .cloned()
            .collect()
    }
}

impl From<&DirectoryConfig> for StaticDirectory {
    fn from(config: &DirectoryConfig) -> Self {
        Self {
            roles: config.roles.clone(),
            departments: config.departments.clone(),
        }
    }
}

impl Directory for StaticDirectory {
    fn users_in_roles(&self, roles: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(Self::members(&self.roles, roles))
    }

    fn users_in_departments(&self, departments: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(Self::members(&self.departments, departments))
    }
}

/// Resolve a specification to user IDs.
///
/// Explicit user lists come back exactly as declared. Role and department
/// sets expand to the distinct union of their members in first-seen order.
/// An empty result is not an error here; the executor turns it into
/// [`EngineError::NoAssignees`].
pub fn resolve(directory: &dyn Directory, spec: &AssigneeSpec) -> EngineResult<Vec<String>> {
    let members = match spec {
        AssigneeSpec::Users(ids) => return Ok(ids.clone()),
        AssigneeSpec::Roles(ids) => directory
            .users_in_roles(ids)
            .map_err(|e| EngineError::Store(format!("role lookup failed: {:#}", e)))?,
        AssigneeSpec::Departments(ids) => directory
            .users_in_departments(ids)
            .map_err(|e| EngineError::Store(format!("department lookup failed: {:#}", e)))?,
    };

    let mut seen = HashSet::new();
    Ok(members
        .into_iter()
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect())
}
