//! Definition command handlers

use super::definition::DefinitionCommands;
use super::session::{parse_id, print_json, Session};
use anyhow::{Context, Result};
use signoff_core::engine::DocumentFormat;
use signoff_core::models::{DefinitionStatus, ProcessDefinition};
use signoff_core::tree::NodeData;
use std::path::Path;

pub async fn handle_definition_commands(session: &Session, command: DefinitionCommands) -> Result<()> {
    match command {
        DefinitionCommands::Import {
            file,
            creator,
            activate,
            json,
        } => {
            handle_definition_import(session, &file, &creator, activate, json).await?;
        }
        DefinitionCommands::List { status, json } => {
            handle_definition_list(session, status, json).await?;
        }
        DefinitionCommands::Show {
            definition_id,
            json,
        } => {
            handle_definition_show(session, &definition_id, json).await?;
        }
        DefinitionCommands::Activate {
            definition_id,
            json,
        } => {
            handle_definition_status(session, &definition_id, DefinitionStatus::Active, json)
                .await?;
        }
        DefinitionCommands::Deactivate {
            definition_id,
            json,
        } => {
            handle_definition_status(session, &definition_id, DefinitionStatus::Inactive, json)
                .await?;
        }
        DefinitionCommands::NewVersion {
            definition_id,
            file,
            creator,
            json,
        } => {
            handle_definition_new_version(session, &definition_id, &file, &creator, json).await?;
        }
    }
    Ok(())
}

fn print_definition_line(definition: &ProcessDefinition) {
    println!(
        "  • {} v{} [{}] {}",
        definition.name, definition.version, definition.status, definition.id
    );
}

pub async fn handle_definition_import(
    session: &Session,
    file: &str,
    creator: &str,
    activate: bool,
    json: bool,
) -> Result<ProcessDefinition> {
    let path = Path::new(file);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file {}", file))?;

    let mut definition = session
        .engine
        .import_definition(&session.store, &raw, DocumentFormat::from_path(path), creator)
        .context("Failed to import definition")?;
    if activate {
        definition = session
            .engine
            .set_definition_status(&session.store, definition.id, DefinitionStatus::Active)?;
    }

    if json {
        print_json(&definition)?;
    } else {
        println!("✅ Imported definition '{}'", definition.name);
        println!("   Definition ID: {}", definition.id);
        println!("   Version:       {}", definition.version);
        println!("   Status:        {}", definition.status);
        if !activate {
            println!();
            println!(
                "Use 'signoff definition activate {}' to allow new instances",
                definition.id
            );
        }
    }
    Ok(definition)
}

pub async fn handle_definition_list(
    session: &Session,
    status: Option<String>,
    json: bool,
) -> Result<()> {
    let status = status
        .map(|s| s.parse::<DefinitionStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let definitions = session.engine.list_definitions(&session.store, status)?;

    if json {
        let output = serde_json::json!({
            "definitions": definitions,
            "count": definitions.len()
        });
        print_json(&output)?;
    } else if definitions.is_empty() {
        println!("No definitions found.");
        println!();
        println!("Import one with 'signoff definition import <file>'.");
    } else {
        println!("Definitions:");
        println!("============");
        for definition in &definitions {
            print_definition_line(definition);
            if let Some(description) = &definition.description {
                println!("    {}", description);
            }
        }
    }
    Ok(())
}

pub async fn handle_definition_show(session: &Session, definition_id: &str, json: bool) -> Result<()> {
    let id = parse_id(definition_id, "definition")?;
    let definition = session.engine.get_definition(&session.store, id)?;
    let (nodes, branches) = session.engine.definition_records(&session.store, id)?;

    if json {
        let output = serde_json::json!({
            "definition": definition,
            "nodes": nodes,
            "branches": branches
        });
        print_json(&output)?;
        return Ok(());
    }

    println!("Definition");
    println!("==========");
    println!("ID:        {}", definition.id);
    println!("Name:      {}", definition.name);
    println!("Category:  {}", definition.category);
    println!("Version:   {}", definition.version);
    println!("Status:    {}", definition.status);
    println!("Created:   {} by {}", definition.created_at.format("%Y-%m-%d %H:%M:%S"), definition.created_by);
    println!();
    println!("Nodes:");
    for node in &nodes {
        let parent = node.parent_key.as_deref().unwrap_or("<root>");
        println!(
            "  {:>2}. {} ({}) under {}",
            node.sort_order, node.node_key, node.node_type, parent
        );
        for branch in branches.iter().filter(|b| b.node_key == node.node_key) {
            println!(
                "      ↳ {} if '{}' -> {}",
                branch.branch_key,
                branch.condition,
                branch.child_key.as_deref().unwrap_or("<none>")
            );
        }
    }
    Ok(())
}

pub async fn handle_definition_status(
    session: &Session,
    definition_id: &str,
    status: DefinitionStatus,
    json: bool,
) -> Result<()> {
    let id = parse_id(definition_id, "definition")?;
    let definition = session
        .engine
        .set_definition_status(&session.store, id, status)?;

    if json {
        print_json(&definition)?;
    } else {
        println!(
            "✅ Definition '{}' v{} is now {}",
            definition.name, definition.version, definition.status
        );
    }
    Ok(())
}

pub async fn handle_definition_new_version(
    session: &Session,
    definition_id: &str,
    file: &str,
    creator: &str,
    json: bool,
) -> Result<ProcessDefinition> {
    let id = parse_id(definition_id, "definition")?;
    let path = Path::new(file);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read node tree file {}", file))?;
    let tree: NodeData = match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::from_str(&raw).context("Failed to parse node tree JSON")?,
        DocumentFormat::Yaml => serde_yaml::from_str(&raw).context("Failed to parse node tree YAML")?,
    };

    let definition = session
        .engine
        .new_version(&session.store, id, tree, creator)?;

    if json {
        print_json(&definition)?;
    } else {
        println!(
            "✅ Created '{}' version {} as a draft",
            definition.name, definition.version
        );
        println!("   Definition ID: {}", definition.id);
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::session::tests::{temp_session, LEAVE};

    #[tokio::test]
    async fn test_import_activate_and_list() {
        let (dir, session) = temp_session();
        let file = dir.path().join("leave.yaml");
        std::fs::write(&file, LEAVE).unwrap();

        let definition = handle_definition_import(&session, file.to_str().unwrap(), "admin", true, true)
            .await
            .unwrap();
        assert_eq!(definition.status, DefinitionStatus::Active);
        assert_eq!(definition.created_by, "admin");

        handle_definition_list(&session, Some("active".to_string()), false)
            .await
            .unwrap();
        assert!(handle_definition_list(&session, Some("bogus".to_string()), true)
            .await
            .is_err());

        handle_definition_show(&session, &definition.id.to_string(), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deactivate_and_new_version() {
        let (dir, session) = temp_session();
        let file = dir.path().join("leave.yml");
        std::fs::write(&file, LEAVE).unwrap();
        let v1 = handle_definition_import(&session, file.to_str().unwrap(), "admin", true, false)
            .await
            .unwrap();

        handle_definition_status(&session, &v1.id.to_string(), DefinitionStatus::Inactive, true)
            .await
            .unwrap();
        let stored = session.engine.get_definition(&session.store, v1.id).unwrap();
        assert_eq!(stored.status, DefinitionStatus::Inactive);

        let tree = dir.path().join("tree.json");
        std::fs::write(
            &tree,
            r#"{"key": "start", "type": "START", "child": {"key": "end", "type": "END"}}"#,
        )
        .unwrap();
        let v2 = handle_definition_new_version(
            &session,
            &v1.id.to_string(),
            tree.to_str().unwrap(),
            "admin",
            false,
        )
        .await
        .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.status, DefinitionStatus::Draft);
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_tree() {
        let (dir, session) = temp_session();
        let file = dir.path().join("bad.json");
        std::fs::write(
            &file,
            r#"{"name": "Bad", "node_tree": {"key": "a", "type": "APPROVAL"}}"#,
        )
        .unwrap();

        let err = handle_definition_import(&session, file.to_str().unwrap(), "admin", false, false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("assignees"));
        assert!(session
            .engine
            .list_definitions(&session.store, None)
            .unwrap()
            .is_empty());
    }
}
