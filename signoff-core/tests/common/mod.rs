//! Shared fixtures for engine integration tests
#![allow(dead_code)]

use serde_json::Value;
use signoff_core::engine::DocumentFormat;
use signoff_core::models::{
    DefinitionStatus, HistoryAction, ProcessDefinition, StartRequest, Values, WorkflowInstance,
};
use signoff_core::{EngineResult, StaticDirectory, WorkflowEngine, WorkflowStore};
use std::sync::Arc;
use uuid::Uuid;

/// Engine whose directory knows a clerk, two managers and an empty role
pub fn engine() -> WorkflowEngine {
    let directory = StaticDirectory::new()
        .with_role("clerks", ["clerk"])
        .with_role("managers", ["manager", "deputy"])
        .with_role("nobody", Vec::<String>::new())
        .with_department("finance", ["f1", "f2"]);
    WorkflowEngine::new(Arc::new(directory))
}

/// Import a definition whose node tree is `tree` and activate it
pub fn active_definition(
    engine: &WorkflowEngine,
    store: &WorkflowStore,
    tree: Value,
) -> ProcessDefinition {
    let doc = serde_json::json!({
        "name": format!("flow-{}", Uuid::new_v4()),
        "category": "test",
        "node_tree": tree,
    });
    let def = engine
        .import_definition(store, &doc.to_string(), DocumentFormat::Json, "admin")
        .unwrap();
    engine
        .set_definition_status(store, def.id, DefinitionStatus::Active)
        .unwrap()
}

/// `START -> APPROVAL(mode, users) -> END`
pub fn single_approval(mode: &str, users: &[&str]) -> Value {
    serde_json::json!({
        "key": "start", "name": "Start", "type": "START",
        "child": {
            "key": "approve", "name": "Approve", "type": "APPROVAL",
            "approval_mode": mode,
            "assignees": {"type": "users", "ids": users},
            "child": {"key": "end", "name": "End", "type": "END"}
        }
    })
}

pub fn values(v: Value) -> Values {
    match v {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn start(
    engine: &WorkflowEngine,
    store: &WorkflowStore,
    definition_id: Uuid,
    form: Option<Value>,
) -> EngineResult<WorkflowInstance> {
    let request = StartRequest {
        definition_id,
        title: "test instance".to_string(),
        business_key: "BK-1".to_string(),
        form_values: form.map(values),
        ..StartRequest::default()
    };
    engine.start(store, request, "initiator")
}

/// History actions of an instance in written order
pub fn actions(engine: &WorkflowEngine, store: &WorkflowStore, instance_id: Uuid) -> Vec<HistoryAction> {
    engine
        .history(store, instance_id)
        .unwrap()
        .into_iter()
        .map(|h| h.action)
        .collect()
}
