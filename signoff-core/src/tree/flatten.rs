//! Flatten a node tree into queryable node and branch records

use super::NodeTree;
use crate::models::definition::{BranchRecord, NodeRecord};
use uuid::Uuid;

/// Walk the tree depth-first and emit one record per node and per branch.
///
/// Keys are copied exactly as declared; `(workflow_id, node_key)` is the join
/// key every later lookup uses. A node reached through a branch records the
/// CONDITION node owning that branch as its parent.
pub fn flatten(workflow_id: Uuid, tree: &NodeTree) -> (Vec<NodeRecord>, Vec<BranchRecord>) {
    let mut nodes = Vec::with_capacity(tree.len());
    let mut branches = Vec::new();
    visit(tree, workflow_id, &tree.root().key, None, &mut nodes, &mut branches);
    (nodes, branches)
}

fn visit(
    tree: &NodeTree,
    workflow_id: Uuid,
    key: &str,
    parent: Option<&str>,
    nodes: &mut Vec<NodeRecord>,
    branches: &mut Vec<BranchRecord>,
) {
    let Some(node) = tree.node(key) else {
        return;
    };

    nodes.push(NodeRecord {
        workflow_id,
        node_key: node.key.clone(),
        name: node.name.clone(),
        node_type: node.node_type,
        approval_mode: node.approval_mode,
        assignees: node.assignees.clone(),
        parent_key: parent.map(str::to_string),
        child_key: node.child.clone(),
        sort_order: nodes.len() as u32,
    });

    if let Some(child) = &node.child {
        visit(tree, workflow_id, child, Some(&node.key), nodes, branches);
    }

    for (i, branch) in node.branches.iter().enumerate() {
        branches.push(BranchRecord {
            workflow_id,
            node_key: node.key.clone(),
            branch_key: branch.key.clone(),
            name: branch.name.clone(),
            branch_type: branch.branch_type,
            condition: branch.condition.clone(),
            child_key: branch.child.clone(),
            sort_order: i as u32,
        });
        if let Some(child) = &branch.child {
            visit(tree, workflow_id, child, Some(&node.key), nodes, branches);
        }
    }
}
