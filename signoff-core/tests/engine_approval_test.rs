//! Integration tests for approval modes and the task lifecycle

mod common;

use common::{actions, active_definition, engine, single_approval, start};
use signoff_core::models::{DefinitionStatus, HistoryAction, InstanceStatus, TaskStatus};
use signoff_core::{EngineError, ErrorKind, WorkflowStore};

/// Test an explicit user list creates one task per listed entry, repeats included
#[test]
fn test_explicit_users_are_taken_as_listed() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u1", "u2"]));
    let instance = start(&engine, &store, def.id, None).unwrap();

    let assignees: Vec<String> = engine
        .tasks_for_instance(&store, instance.id)
        .unwrap()
        .into_iter()
        .map(|t| t.assignee)
        .collect();
    assert_eq!(assignees, vec!["u1", "u1", "u2"]);
    assert_eq!(engine.pending_tasks_for(&store, "u1").unwrap().len(), 2);
}

/// Test all-mode: two tasks, both approvals drive the instance to approved
#[test]
fn test_all_mode_approves_after_every_task() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u2"]));

    let instance = start(&engine, &store, def.id, None).unwrap();
    assert_eq!(instance.status, InstanceStatus::Running);
    assert_eq!(instance.current_node_keys, vec!["approve".to_string()]);

    let tasks = engine.tasks_for_instance(&store, instance.id).unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));

    engine.approve(&store, tasks[0].id, "u1", "ok", None).unwrap();
    let mid = engine.get_instance(&store, instance.id).unwrap();
    assert_eq!(mid.status, InstanceStatus::Running);
    assert!(mid.ended_at.is_none());

    engine.approve(&store, tasks[1].id, "u2", "fine", None).unwrap();
    let done = engine.get_instance(&store, instance.id).unwrap();
    assert_eq!(done.status, InstanceStatus::Approved);
    assert!(done.ended_at.is_some());
    assert!(done.current_node_keys.is_empty());
    assert_eq!(
        done.execution_path,
        vec!["start".to_string(), "approve".to_string(), "end".to_string()]
    );

    assert_eq!(
        actions(&engine, &store, instance.id),
        vec![
            HistoryAction::Started,
            HistoryAction::Approved,
            HistoryAction::Approved,
            HistoryAction::Completed
        ]
    );
}

/// Test all-mode: one rejection vetoes the instance regardless of the sibling
#[test]
fn test_all_mode_single_rejection_vetoes() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u2"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    let tasks = engine.tasks_for_instance(&store, instance.id).unwrap();

    let rejected = engine.reject(&store, tasks[1].id, "u2", "no budget").unwrap();
    assert_eq!(rejected.status, TaskStatus::Rejected);
    assert_eq!(rejected.comment, "no budget");
    assert!(rejected.processed_at.is_some());

    let after = engine.get_instance(&store, instance.id).unwrap();
    assert_eq!(after.status, InstanceStatus::Rejected);
    assert!(after.ended_at.is_some());

    // The sibling is orphaned, and cannot be acted on any more
    let err = engine.approve(&store, tasks[0].id, "u1", "", None).unwrap_err();
    assert!(matches!(err, EngineError::InstanceNotRunning { .. }));
    assert_eq!(
        engine.get_task(&store, tasks[0].id).unwrap().status,
        TaskStatus::Pending
    );

    let history = actions(&engine, &store, instance.id);
    assert_eq!(
        history.iter().filter(|a| **a == HistoryAction::Rejected).count(),
        1
    );
    assert!(!history.contains(&HistoryAction::Completed));
}

/// Test any-mode completes on the first approval and stale siblings cannot act
#[test]
fn test_any_mode_first_approval_wins() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let tree = serde_json::json!({
        "key": "start", "type": "START",
        "child": {
            "key": "first", "name": "Either", "type": "APPROVAL", "approval_mode": "any",
            "assignees": {"type": "users", "ids": ["a", "b"]},
            "child": {
                "key": "second", "name": "Final", "type": "APPROVAL", "approval_mode": "all",
                "assignees": {"type": "users", "ids": ["c"]},
                "child": {"key": "end", "type": "END"}
            }
        }
    });
    let def = active_definition(&engine, &store, tree);
    let instance = start(&engine, &store, def.id, None).unwrap();
    let first = engine.tasks_for_instance(&store, instance.id).unwrap();
    assert_eq!(first.len(), 2);

    engine.approve(&store, first[0].id, "a", "", None).unwrap();
    let moved = engine.get_instance(&store, instance.id).unwrap();
    assert_eq!(moved.current_node_keys, vec!["second".to_string()]);

    // b's task stays pending but its node is no longer active
    let err = engine.approve(&store, first[1].id, "b", "", None).unwrap_err();
    assert!(matches!(err, EngineError::NodeNotActive { ref node_key, .. } if node_key == "first"));
    let err = engine.reject(&store, first[1].id, "b", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    let second = engine.pending_tasks_for(&store, "c").unwrap();
    assert_eq!(second.len(), 1);
    engine.approve(&store, second[0].id, "c", "", None).unwrap();
    assert_eq!(
        engine.get_instance(&store, instance.id).unwrap().status,
        InstanceStatus::Approved
    );
}

/// Test sequence-mode creates exactly one task, for the first assignee
#[test]
fn test_sequence_mode_single_task() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("sequence", &["x", "y", "z"]));
    let instance = start(&engine, &store, def.id, None).unwrap();

    let tasks = engine.tasks_for_instance(&store, instance.id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].assignee, "x");
    assert!(engine.pending_tasks_for(&store, "y").unwrap().is_empty());

    engine.approve(&store, tasks[0].id, "x", "", None).unwrap();
    assert_eq!(
        engine.get_instance(&store, instance.id).unwrap().status,
        InstanceStatus::Approved
    );
}

/// Test sequence-mode rejection alone decides the node
#[test]
fn test_sequence_mode_rejection() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("sequence", &["x", "y"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    let task = &engine.tasks_for_instance(&store, instance.id).unwrap()[0];

    engine.reject(&store, task.id, "x", "nope").unwrap();
    assert_eq!(
        engine.get_instance(&store, instance.id).unwrap().status,
        InstanceStatus::Rejected
    );
}

/// Test a resolved task cannot be resolved again and no history is duplicated
#[test]
fn test_double_resolution_fails() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u2"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    let tasks = engine.tasks_for_instance(&store, instance.id).unwrap();

    engine.approve(&store, tasks[0].id, "u1", "", None).unwrap();
    let before = engine.history(&store, instance.id).unwrap().len();

    let err = engine.approve(&store, tasks[0].id, "u1", "", None).unwrap_err();
    assert!(matches!(err, EngineError::TaskAlreadyResolved { task_id, .. } if task_id == tasks[0].id));
    let err = engine.reject(&store, tasks[0].id, "u1", "").unwrap_err();
    assert!(matches!(err, EngineError::TaskAlreadyResolved { .. }));

    assert_eq!(engine.history(&store, instance.id).unwrap().len(), before);
    assert_eq!(
        engine.get_instance(&store, instance.id).unwrap().status,
        InstanceStatus::Running
    );
}

/// Test only the assignee may act on a task
#[test]
fn test_not_assignee() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    let task = &engine.tasks_for_instance(&store, instance.id).unwrap()[0];

    let err = engine.approve(&store, task.id, "intruder", "", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(err.to_string().contains("intruder"));

    let missing = uuid::Uuid::new_v4();
    let err = engine.approve(&store, missing, "u1", "", None).unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(id) if id == missing));
}

/// Test starting a draft or inactive definition fails and creates no instance
#[test]
fn test_definition_must_be_active() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1"]));

    for status in [DefinitionStatus::Draft, DefinitionStatus::Inactive] {
        engine.set_definition_status(&store, def.id, status).unwrap();
        let err = start(&engine, &store, def.id, None).unwrap_err();
        assert!(
            matches!(err, EngineError::DefinitionNotActive { id, ref status } if id == def.id && !status.is_empty())
        );
    }
    assert_eq!(engine.statistics(&store, None).unwrap().instance_count, 0);
    assert!(store.read(|s| s.history.is_empty() && s.tasks.is_empty()).unwrap());
}

/// Test approval form values land on the task, the history and the variables
#[test]
fn test_approval_form_values() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u2"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    let tasks = engine.tasks_for_instance(&store, instance.id).unwrap();

    let form = common::values(serde_json::json!({"approved_amount": 80}));
    let task = engine
        .approve(&store, tasks[0].id, "u1", "partial", Some(form.clone()))
        .unwrap();
    assert_eq!(task.form_values.as_ref(), Some(&form));

    let instance = engine.get_instance(&store, instance.id).unwrap();
    assert_eq!(instance.variables.get("approved_amount"), Some(&serde_json::json!(80)));

    let history = engine.history(&store, instance.id).unwrap();
    let approved = history
        .iter()
        .find(|h| h.action == HistoryAction::Approved)
        .unwrap();
    assert_eq!(approved.form_values.as_ref(), Some(&form));
    assert_eq!(approved.operator, "u1");
    assert_eq!(approved.node_key, "approve");
    assert_eq!(approved.variables.get("approved_amount"), Some(&serde_json::json!(80)));
}

/// Test history sequence numbers are strictly increasing in written order
#[test]
fn test_history_timeline_is_monotonic() {
    let store = WorkflowStore::in_memory();
    let engine = engine();
    let def = active_definition(&engine, &store, single_approval("all", &["u1", "u2"]));
    let instance = start(&engine, &store, def.id, None).unwrap();
    for task in engine.tasks_for_instance(&store, instance.id).unwrap() {
        let actor = task.assignee.clone();
        engine.approve(&store, task.id, &actor, "", None).unwrap();
    }

    let history = engine.history(&store, instance.id).unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(history[0].operator, "initiator");
}
