use super::session::{parse_id, parse_values, print_json, Session};
use super::task::TaskCommands;

use anyhow::Result;
use signoff_core::models::WorkflowTask;

pub async fn handle_task_commands(session: &Session, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::Mine { user, json } => {
            handle_task_mine(session, &user, json).await?;
        }
        TaskCommands::Show { task_id, json } => {
            handle_task_show(session, &task_id, json).await?;
        }
        TaskCommands::Approve {
            task_id,
            user,
            comment,
            form,
            json,
        } => {
            handle_task_approve(session, &task_id, &user, &comment, form.as_deref(), json).await?;
        }
        TaskCommands::Reject {
            task_id,
            user,
            comment,
            json,
        } => {
            handle_task_reject(session, &task_id, &user, &comment, json).await?;
        }
    }
    Ok(())
}

fn print_task(task: &WorkflowTask) {
    println!("  ID:       {}", task.id);
    println!("  Instance: {}", task.instance_id);
    println!("  Node:     {} ({})", task.node_name, task.node_key);
    println!("  Assignee: {}", task.assignee);
    println!("  Status:   {}", task.status);
    println!("  Priority: {}", task.priority);
    println!("  Created:  {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(due_at) = task.due_at {
        println!("  Due:      {}", due_at.format("%Y-%m-%d %H:%M:%S"));
    }
    if !task.comment.is_empty() {
        println!("  Comment:  {}", task.comment);
    }
}

pub async fn handle_task_mine(session: &Session, user: &str, json: bool) -> Result<Vec<WorkflowTask>> {
    let tasks = session.engine.pending_tasks_for(&session.store, user)?;

    if json {
        let output = serde_json::json!({
            "user": user,
            "tasks": tasks,
            "count": tasks.len()
        });
        print_json(&output)?;
    } else if tasks.is_empty() {
        println!("No pending tasks for '{}'.", user);
    } else {
        println!("Pending tasks for '{}':", user);
        for task in &tasks {
            println!(
                "  • [{}] {} on {} ({})",
                task.priority, task.id, task.node_name, task.instance_id
            );
        }
    }
    Ok(tasks)
}

pub async fn handle_task_show(session: &Session, task_id: &str, json: bool) -> Result<()> {
    let id = parse_id(task_id, "task")?;
    let task = session.engine.get_task(&session.store, id)?;

    if json {
        print_json(&task)?;
    } else {
        println!("Task:");
        print_task(&task);
    }
    Ok(())
}

pub async fn handle_task_approve(
    session: &Session,
    task_id: &str,
    user: &str,
    comment: &str,
    form: Option<&str>,
    json: bool,
) -> Result<WorkflowTask> {
    let id = parse_id(task_id, "task")?;
    let form_values = form.map(parse_values).transpose()?;
    let task = session
        .engine
        .approve(&session.store, id, user, comment, form_values)?;
    let instance = session.engine.get_instance(&session.store, task.instance_id)?;

    if json {
        let output = serde_json::json!({
            "task": task,
            "instance_status": instance.status,
            "current_node_keys": instance.current_node_keys
        });
        print_json(&output)?;
    } else {
        println!("✅ Approved task {}", task.id);
        println!("   Instance is {}", instance.status);
        if !instance.current_node_keys.is_empty() {
            println!("   Waiting at: {}", instance.current_node_keys.join(", "));
        }
    }
    Ok(task)
}

pub async fn handle_task_reject(
    session: &Session,
    task_id: &str,
    user: &str,
    comment: &str,
    json: bool,
) -> Result<WorkflowTask> {
    let id = parse_id(task_id, "task")?;
    let task = session.engine.reject(&session.store, id, user, comment)?;

    if json {
        print_json(&task)?;
    } else {
        println!("❌ Rejected task {}", task.id);
        println!("   Instance {} is rejected", task.instance_id);
    }
    Ok(task)
}
