//! Process definition node tree
//!
//! The wire form is a nested record (`child` / `branches[].child`). In memory the
//! tree is an arena of nodes indexed by key, with children stored as key
//! references, so resuming at a node key is a map lookup.

pub mod flatten;
pub mod validator;

pub use flatten::*;
pub use validator::*;

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Node type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    #[serde(alias = "root")]
    Root,
    #[serde(alias = "start")]
    Start,
    #[serde(alias = "end")]
    End,
    #[serde(alias = "approval")]
    Approval,
    #[serde(alias = "condition")]
    Condition,
    #[serde(alias = "parallel")]
    Parallel,
    #[serde(alias = "merge")]
    Merge,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Root => "ROOT",
            NodeType::Start => "START",
            NodeType::End => "END",
            NodeType::Approval => "APPROVAL",
            NodeType::Condition => "CONDITION",
            NodeType::Parallel => "PARALLEL",
            NodeType::Merge => "MERGE",
        };
        f.write_str(name)
    }
}

/// How many of a node's tasks must resolve, and how, before the node completes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// One task, for the first resolved assignee
    #[default]
    Sequence,
    /// One task per assignee, every task must resolve
    Parallel,
    /// One task per assignee, first approval completes the node
    Any,
    /// One task per assignee, every task must resolve
    All,
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApprovalMode::Sequence => "sequence",
            ApprovalMode::Parallel => "parallel",
            ApprovalMode::Any => "any",
            ApprovalMode::All => "all",
        };
        f.write_str(name)
    }
}

/// Approver specification of an APPROVAL node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "ids", rename_all = "snake_case")]
pub enum AssigneeSpec {
    /// Explicit user IDs, used verbatim
    Users(Vec<String>),
    /// Users holding any of these roles
    Roles(Vec<String>),
    /// Users belonging to any of these departments
    Departments(Vec<String>),
}

impl AssigneeSpec {
    /// True when the specification names no IDs at all
    pub fn is_empty(&self) -> bool {
        match self {
            AssigneeSpec::Users(ids) | AssigneeSpec::Roles(ids) | AssigneeSpec::Departments(ids) => {
                ids.is_empty()
            }
        }
    }
}

/// A node in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub key: String,
    pub name: String,
    pub node_type: NodeType,
    pub approval_mode: ApprovalMode,
    pub assignees: Option<AssigneeSpec>,
    /// Key of the single child, if any
    pub child: Option<String>,
    pub branches: Vec<Branch>,
}

/// A conditional branch of a CONDITION node
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub key: String,
    pub name: String,
    pub branch_type: NodeType,
    /// Condition expression; empty means always true
    pub condition: String,
    /// Key of the branch's first node, if any
    pub child: Option<String>,
}

/// Arena form of a definition's node tree
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    root: String,
    nodes: HashMap<String, TreeNode>,
}

/// Nested wire form of a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeData {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_mode: Option<ApprovalMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<AssigneeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<NodeData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchData>,
}

/// Nested wire form of a branch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchData {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_branch_type")]
    pub branch_type: NodeType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<NodeData>>,
}

fn default_branch_type() -> NodeType {
    NodeType::Condition
}

impl NodeTree {
    /// Parse a JSON payload into a tree
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let data: NodeData =
            serde_json::from_str(raw).map_err(|e| EngineError::MalformedTree(e.to_string()))?;
        Self::from_data(&data)
    }

    /// Serialize the tree to its JSON payload
    pub fn serialize(&self) -> EngineResult<String> {
        let data = self.to_data();
        serde_json::to_string(&data).map_err(|e| EngineError::MalformedTree(e.to_string()))
    }

    /// Build the arena from the nested form, rejecting duplicate keys
    pub fn from_data(data: &NodeData) -> EngineResult<Self> {
        let mut nodes = HashMap::new();
        let mut branch_keys = Vec::new();
        insert_node(data, &mut nodes, &mut branch_keys)?;

        for key in branch_keys {
            if nodes.contains_key(&key) {
                return Err(EngineError::DuplicateNodeKey(key));
            }
        }

        Ok(Self {
            root: data.key.clone(),
            nodes,
        })
    }

    /// Rebuild the nested form
    pub fn to_data(&self) -> NodeData {
        self.node_data(&self.root)
    }

    fn node_data(&self, key: &str) -> NodeData {
        let node = &self.nodes[key];
        NodeData {
            key: node.key.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            approval_mode: (node.node_type == NodeType::Approval
                || node.approval_mode != ApprovalMode::default())
            .then_some(node.approval_mode),
            assignees: node.assignees.clone(),
            child: node.child.as_ref().map(|c| Box::new(self.node_data(c))),
            branches: node
                .branches
                .iter()
                .map(|b| BranchData {
                    key: b.key.clone(),
                    name: b.name.clone(),
                    branch_type: b.branch_type,
                    condition: b.condition.clone(),
                    child: b.child.as_ref().map(|c| Box::new(self.node_data(c))),
                })
                .collect(),
        }
    }

    /// Root node
    pub fn root(&self) -> &TreeNode {
        &self.nodes[&self.root]
    }

    /// Look up a node by key
    pub fn node(&self, key: &str) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    /// Child of the node with the given key (the resume position after it completes)
    pub fn child_of(&self, key: &str) -> Option<&TreeNode> {
        self.nodes
            .get(key)
            .and_then(|n| n.child.as_deref())
            .and_then(|c| self.nodes.get(c))
    }

    /// Number of nodes (branches excluded)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in depth-first declaration order: node, child subtree, then branch subtrees
    pub fn depth_first(&self) -> Vec<&TreeNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root.as_str()];
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            out.push(node);
            for branch in node.branches.iter().rev() {
                if let Some(child) = &branch.child {
                    stack.push(child);
                }
            }
            if let Some(child) = &node.child {
                stack.push(child);
            }
        }
        out
    }
}

fn insert_node(
    data: &NodeData,
    nodes: &mut HashMap<String, TreeNode>,
    branch_keys: &mut Vec<String>,
) -> EngineResult<()> {
    if data.key.is_empty() {
        return Err(EngineError::MalformedTree(format!(
            "node '{}' has an empty key",
            data.name
        )));
    }
    if nodes.contains_key(&data.key) || branch_keys.contains(&data.key) {
        return Err(EngineError::DuplicateNodeKey(data.key.clone()));
    }

    let mut branches = Vec::with_capacity(data.branches.len());
    for b in &data.branches {
        if b.key.is_empty() {
            return Err(EngineError::MalformedTree(format!(
                "branch of node '{}' has an empty key",
                data.key
            )));
        }
        if b.key == data.key || branch_keys.contains(&b.key) {
            return Err(EngineError::DuplicateNodeKey(b.key.clone()));
        }
        branch_keys.push(b.key.clone());
        branches.push(Branch {
            key: b.key.clone(),
            name: b.name.clone(),
            branch_type: b.branch_type,
            condition: b.condition.clone(),
            child: b.child.as_ref().map(|c| c.key.clone()),
        });
    }

    nodes.insert(
        data.key.clone(),
        TreeNode {
            key: data.key.clone(),
            name: data.name.clone(),
            node_type: data.node_type,
            approval_mode: data.approval_mode.unwrap_or_default(),
            assignees: data.assignees.clone(),
            child: data.child.as_ref().map(|c| c.key.clone()),
            branches,
        },
    );

    if let Some(child) = &data.child {
        insert_node(child, nodes, branch_keys)?;
    }
    for b in &data.branches {
        if let Some(child) = &b.child {
            insert_node(child, nodes, branch_keys)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "key": "root", "name": "Root", "type": "ROOT",
        "child": {
            "key": "cond", "name": "Amount check", "type": "CONDITION",
            "branches": [
                {"key": "big", "name": "Large", "type": "CONDITION", "condition": "amount > 100",
                 "child": {"key": "mgr", "name": "Manager", "type": "APPROVAL", "approval_mode": "all",
                           "assignees": {"type": "users", "ids": ["m1", "m2"]},
                           "child": {"key": "end1", "name": "End", "type": "END"}}}
            ],
            "child": {"key": "clerk", "name": "Clerk", "type": "approval",
                      "assignees": {"type": "roles", "ids": ["clerks"]},
                      "child": {"key": "end2", "name": "End", "type": "end"}}
        }
    }"#;

    #[test]
    fn test_parse_builds_arena() {
        let tree = NodeTree::parse(SAMPLE).unwrap();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.root().node_type, NodeType::Root);
        assert_eq!(tree.child_of("root").unwrap().key, "cond");
        assert_eq!(tree.child_of("mgr").unwrap().key, "end1");

        let clerk = tree.node("clerk").unwrap();
        assert_eq!(clerk.approval_mode, ApprovalMode::Sequence);
        assert_eq!(
            clerk.assignees,
            Some(AssigneeSpec::Roles(vec!["clerks".to_string()]))
        );

        let cond = tree.node("cond").unwrap();
        assert_eq!(cond.branches.len(), 1);
        assert_eq!(cond.branches[0].condition, "amount > 100");
        assert_eq!(cond.branches[0].child.as_deref(), Some("mgr"));
    }

    #[test]
    fn test_round_trip() {
        let tree = NodeTree::parse(SAMPLE).unwrap();
        let raw = tree.serialize().unwrap();
        let again = NodeTree::parse(&raw).unwrap();
        assert_eq!(tree, again);
        assert_eq!(raw, again.serialize().unwrap());
    }

    #[test]
    fn test_depth_first_order() {
        let tree = NodeTree::parse(SAMPLE).unwrap();
        let keys: Vec<&str> = tree.depth_first().iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["root", "cond", "clerk", "end2", "mgr", "end1"]);
    }

    #[test]
    fn test_malformed_payload() {
        let err = NodeTree::parse("{\"key\": 3}").unwrap_err();
        assert!(matches!(err, EngineError::MalformedTree(_)));

        let err = NodeTree::parse(r#"{"key": "a", "type": "BOGUS"}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedTree(_)));
    }

    #[test]
    fn test_duplicate_node_key() {
        let raw = r#"{"key": "a", "type": "START", "child": {"key": "a", "type": "END"}}"#;
        let err = NodeTree::parse(raw).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNodeKey(ref k) if k == "a"));
    }

    #[test]
    fn test_branch_key_collides_with_node_key() {
        let raw = r#"{"key": "c", "type": "CONDITION",
            "branches": [{"key": "x", "condition": "true"}],
            "child": {"key": "x", "type": "END"}}"#;
        let err = NodeTree::parse(raw).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNodeKey(ref k) if k == "x"));
    }
}
