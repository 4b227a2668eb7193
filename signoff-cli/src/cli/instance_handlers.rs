//! Instance command handlers

use super::instance::InstanceCommands;
use super::session::{parse_id, parse_values, print_json, Session};
use anyhow::{Context, Result};
use signoff_core::models::{InstanceFilter, InstanceStatus, StartRequest, WorkflowInstance};

/// Administrative status change requested from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Cancel,
    Suspend,
    Resume,
}

pub async fn handle_instance_commands(session: &Session, command: InstanceCommands) -> Result<()> {
    match command {
        InstanceCommands::Start {
            definition_id,
            title,
            business_key,
            business_type,
            form,
            variables,
            initiator,
            json,
        } => {
            let request = StartRequest {
                definition_id: parse_id(&definition_id, "definition")?,
                title,
                business_key,
                business_type,
                form_values: form.as_deref().map(parse_values).transpose()?,
                variables: variables.as_deref().map(parse_values).transpose()?,
                ..StartRequest::default()
            };
            handle_instance_start(session, request, &initiator, json).await?;
        }
        InstanceCommands::Show { instance_id, json } => {
            handle_instance_show(session, &instance_id, json).await?;
        }
        InstanceCommands::List {
            status,
            initiator,
            involving,
            json,
        } => {
            let status = status
                .map(|s| s.parse::<InstanceStatus>())
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            let filter = InstanceFilter {
                initiator,
                status,
                involving,
            };
            handle_instance_list(session, &filter, json).await?;
        }
        InstanceCommands::Cancel {
            instance_id,
            operator,
            comment,
            json,
        } => {
            handle_instance_status(session, &instance_id, StatusChange::Cancel, &operator, &comment, json)
                .await?;
        }
        InstanceCommands::Suspend {
            instance_id,
            operator,
            comment,
            json,
        } => {
            handle_instance_status(session, &instance_id, StatusChange::Suspend, &operator, &comment, json)
                .await?;
        }
        InstanceCommands::Resume {
            instance_id,
            operator,
            comment,
            json,
        } => {
            handle_instance_status(session, &instance_id, StatusChange::Resume, &operator, &comment, json)
                .await?;
        }
        InstanceCommands::History { instance_id, json } => {
            handle_instance_history(session, &instance_id, json).await?;
        }
    }
    Ok(())
}

pub async fn handle_instance_start(
    session: &Session,
    request: StartRequest,
    initiator: &str,
    json: bool,
) -> Result<WorkflowInstance> {
    let instance = session
        .engine
        .start(&session.store, request, initiator)
        .context("Failed to start instance")?;

    if json {
        print_json(&instance)?;
    } else {
        println!("✅ Started instance '{}'", instance.title);
        println!("   Instance ID: {}", instance.id);
        println!("   Status:      {}", instance.status);
        if !instance.current_node_keys.is_empty() {
            println!("   Waiting at:  {}", instance.current_node_keys.join(", "));
        }
        println!();
        println!("Use 'signoff instance show {}' to check progress", instance.id);
    }
    Ok(instance)
}

pub async fn handle_instance_show(session: &Session, instance_id: &str, json: bool) -> Result<()> {
    let id = parse_id(instance_id, "instance")?;
    let instance = session.engine.get_instance(&session.store, id)?;
    let tasks = session.engine.tasks_for_instance(&session.store, id)?;

    if json {
        let output = serde_json::json!({
            "instance": instance,
            "tasks": tasks
        });
        print_json(&output)?;
        return Ok(());
    }

    println!("Instance");
    println!("========");
    println!("ID:            {}", instance.id);
    println!("Title:         {}", instance.title);
    println!("Definition:    {}", instance.definition_id);
    println!("Status:        {}", instance.status);
    println!("Initiator:     {}", instance.initiator);
    if !instance.business_key.is_empty() {
        println!("Business key:  {}", instance.business_key);
    }
    println!("Started at:    {}", instance.started_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(ended_at) = instance.ended_at {
        println!("Ended at:      {}", ended_at.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Current nodes: {}", instance.current_node_keys.join(", "));
    println!("Path:          {}", instance.execution_path.join(" -> "));

    if !tasks.is_empty() {
        println!();
        println!("Tasks:");
        for task in &tasks {
            println!(
                "  {} {} [{}] {}",
                task.id, task.node_key, task.status, task.assignee
            );
        }
    }
    Ok(())
}

pub async fn handle_instance_list(session: &Session, filter: &InstanceFilter, json: bool) -> Result<()> {
    let instances = session.engine.list_instances(&session.store, filter)?;

    if json {
        let output = serde_json::json!({
            "instances": instances,
            "count": instances.len()
        });
        print_json(&output)?;
    } else if instances.is_empty() {
        println!("No instances found.");
    } else {
        println!("Instances:");
        println!("==========");
        for instance in &instances {
            println!(
                "  • {} [{}] {} (by {}, {})",
                instance.title,
                instance.status,
                instance.id,
                instance.initiator,
                instance.started_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

pub async fn handle_instance_status(
    session: &Session,
    instance_id: &str,
    change: StatusChange,
    operator: &str,
    comment: &str,
    json: bool,
) -> Result<WorkflowInstance> {
    let id = parse_id(instance_id, "instance")?;
    let engine = &session.engine;
    let instance = match change {
        StatusChange::Cancel => engine.cancel(&session.store, id, operator, comment)?,
        StatusChange::Suspend => engine.suspend(&session.store, id, operator, comment)?,
        StatusChange::Resume => engine.resume(&session.store, id, operator, comment)?,
    };

    if json {
        print_json(&instance)?;
    } else {
        println!("✅ Instance '{}' is now {}", instance.title, instance.status);
    }
    Ok(instance)
}

pub async fn handle_instance_history(session: &Session, instance_id: &str, json: bool) -> Result<()> {
    let id = parse_id(instance_id, "instance")?;
    let history = session.engine.history(&session.store, id)?;

    if json {
        let output = serde_json::json!({
            "instance_id": id,
            "history": history
        });
        print_json(&output)?;
        return Ok(());
    }

    println!("History of {}", id);
    println!("==========={}", "=".repeat(id.to_string().len()));
    for entry in &history {
        let node = if entry.node_key.is_empty() {
            String::new()
        } else {
            format!(" at {}", entry.node_key)
        };
        let comment = if entry.comment.is_empty() {
            String::new()
        } else {
            format!(": {}", entry.comment)
        };
        println!(
            "  {:>3}. {} {} by {}{}{}",
            entry.sequence,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.operator,
            node,
            comment
        );
    }
    Ok(())
}
