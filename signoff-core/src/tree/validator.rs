//! Node tree validation logic

use super::{BranchData, NodeData, NodeType};
use crate::engine::condition::Expr;
use std::collections::HashSet;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: String, message: String) {
        self.errors.push(ValidationError { field, message });
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Errors rendered as `field: message`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// Node tree validator
pub struct TreeValidator;

impl TreeValidator {
    /// Validate a nested node tree, collecting every problem instead of stopping at the first
    pub fn validate(root: &NodeData) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut seen = HashSet::new();
        let mut reaches_end = false;

        if !matches!(root.node_type, NodeType::Root | NodeType::Start) {
            result.add_warning(format!(
                "Tree starts at {} node '{}' instead of ROOT or START",
                root.node_type, root.key
            ));
        }

        Self::check_node(root, &mut seen, &mut reaches_end, &mut result);

        if !reaches_end {
            result.add_warning("Tree has no END node; instances can never be approved".to_string());
        }

        result
    }

    fn check_key(key: &str, field: &str, seen: &mut HashSet<String>, result: &mut ValidationResult) {
        if key.is_empty() {
            result.add_error(field.to_string(), "Key cannot be empty".to_string());
        } else if !seen.insert(key.to_string()) {
            result.add_error(field.to_string(), format!("Duplicate key '{}'", key));
        }
    }

    fn check_node(
        node: &NodeData,
        seen: &mut HashSet<String>,
        reaches_end: &mut bool,
        result: &mut ValidationResult,
    ) {
        let field = format!("nodes.{}", node.key);
        Self::check_key(&node.key, &field, seen, result);

        match node.node_type {
            NodeType::Approval => match &node.assignees {
                None => result.add_error(
                    format!("{}.assignees", field),
                    "APPROVAL node needs an assignee specification".to_string(),
                ),
                Some(spec) if spec.is_empty() => result.add_error(
                    format!("{}.assignees", field),
                    "Assignee specification lists no IDs".to_string(),
                ),
                Some(_) => {}
            },
            NodeType::Parallel | NodeType::Merge => result.add_warning(format!(
                "Node '{}' has type {}, which fails at run time",
                node.key, node.node_type
            )),
            NodeType::Condition if node.branches.is_empty() => result.add_warning(format!(
                "CONDITION node '{}' has no branches and always takes its default path",
                node.key
            )),
            NodeType::End => {
                *reaches_end = true;
                if node.child.is_some() || !node.branches.is_empty() {
                    result.add_warning(format!(
                        "Nodes after END node '{}' are never visited",
                        node.key
                    ));
                }
            }
            _ => {}
        }

        if node.node_type != NodeType::Approval && node.approval_mode.is_some() {
            result.add_warning(format!(
                "approval_mode on {} node '{}' is ignored",
                node.node_type, node.key
            ));
        }
        if node.node_type != NodeType::Condition && !node.branches.is_empty() {
            result.add_warning(format!(
                "Branches on {} node '{}' are never evaluated",
                node.node_type, node.key
            ));
        }

        let is_leaf = node.child.is_none() && node.branches.iter().all(|b| b.child.is_none());
        if is_leaf && node.node_type != NodeType::End {
            result.add_warning(format!(
                "Path ending at '{}' does not reach an END node",
                node.key
            ));
        }

        for branch in &node.branches {
            Self::check_branch(node, branch, seen, reaches_end, result);
        }
        if let Some(child) = &node.child {
            Self::check_node(child, seen, reaches_end, result);
        }
    }

    fn check_branch(
        owner: &NodeData,
        branch: &BranchData,
        seen: &mut HashSet<String>,
        reaches_end: &mut bool,
        result: &mut ValidationResult,
    ) {
        let field = format!("nodes.{}.branches.{}", owner.key, branch.key);
        Self::check_key(&branch.key, &field, seen, result);

        if let Err(e) = Expr::parse(&branch.condition) {
            result.add_error(
                format!("{}.condition", field),
                format!("Invalid condition '{}': {}", branch.condition, e),
            );
        }

        match &branch.child {
            Some(child) => Self::check_node(child, seen, reaches_end, result),
            None => result.add_warning(format!(
                "Branch '{}' of node '{}' has no child and is skipped when it matches",
                branch.key, owner.key
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(raw: &str) -> NodeData {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_valid_tree() {
        let tree = data(
            r#"{"key": "s", "type": "START",
                "child": {"key": "a", "type": "APPROVAL", "approval_mode": "all",
                          "assignees": {"type": "users", "ids": ["u1", "u2"]},
                          "child": {"key": "e", "type": "END"}}}"#,
        );
        let result = TreeValidator::validate(&tree);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_approval_without_assignees() {
        let tree = data(
            r#"{"key": "s", "type": "START",
                "child": {"key": "a", "type": "APPROVAL",
                          "child": {"key": "e", "type": "END"}}}"#,
        );
        let result = TreeValidator::validate(&tree);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].field, "nodes.a.assignees");
    }

    #[test]
    fn test_duplicate_and_empty_keys_are_all_reported() {
        let tree = data(
            r#"{"key": "s", "type": "START",
                "child": {"key": "s", "type": "CONDITION",
                          "branches": [{"key": "", "condition": "x > 1",
                                        "child": {"key": "e", "type": "END"}}]}}"#,
        );
        let result = TreeValidator::validate(&tree);
        let messages = result.error_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("Duplicate key 's'")));
        assert!(messages.iter().any(|m| m.contains("Key cannot be empty")));
    }

    #[test]
    fn test_malformed_condition() {
        let tree = data(
            r#"{"key": "c", "type": "CONDITION",
                "branches": [{"key": "b", "condition": "amount >",
                              "child": {"key": "e", "type": "END"}}],
                "child": {"key": "e2", "type": "END"}}"#,
        );
        let result = TreeValidator::validate(&tree);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "nodes.c.branches.b.condition");
    }

    #[test]
    fn test_warnings() {
        let tree = data(
            r#"{"key": "r", "type": "ROOT",
                "child": {"key": "p", "type": "PARALLEL",
                          "child": {"key": "c", "type": "CONDITION",
                                    "child": {"key": "dead", "type": "START"}}}}"#,
        );
        let result = TreeValidator::validate(&tree);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("no END node")));
        assert!(result.warnings.iter().any(|w| w.contains("PARALLEL")));
        assert!(result.warnings.iter().any(|w| w.contains("no branches")));
        assert!(result.warnings.iter().any(|w| w.contains("'dead' does not reach")));
    }
}
