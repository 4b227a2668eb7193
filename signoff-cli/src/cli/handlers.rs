//! CLI command handlers for statistics and configuration

use super::config::ConfigCommands;
use super::session::{print_json, Session};
use anyhow::{Context, Result};
use signoff_core::models::{Configuration, LogLevel};
use std::path::{Path, PathBuf};

/// Expand a leading `~/` to the home directory
pub fn expand_home(raw: &str) -> Result<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => {
            let home =
                dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(raw)),
    }
}

pub async fn handle_config_commands(config_path: &Path, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init {
            store_path,
            log_level,
            force,
            json,
        } => {
            handle_config_init(config_path, store_path, log_level, force, json).await?;
        }
        ConfigCommands::Show { json } => {
            handle_config_show(config_path, json).await?;
        }
    }
    Ok(())
}

/// Handle the 'config init' command
pub async fn handle_config_init(
    config_path: &Path,
    store_path: Option<String>,
    log_level: Option<String>,
    force: bool,
    json: bool,
) -> Result<Configuration> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file {} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let mut config = Configuration::default();
    if let Some(raw) = store_path {
        config.store_path = expand_home(&raw)?;
    }
    if let Some(raw) = log_level {
        config.log_level = raw.parse::<LogLevel>().map_err(|e| anyhow::anyhow!(e))?;
    }

    if let Err(errors) = config.validate() {
        anyhow::bail!("Configuration validation failed: {}", errors.join("; "));
    }

    config
        .save_to_file(config_path)
        .context("Failed to save configuration")?;

    if json {
        let output = serde_json::json!({
            "config_file": config_path,
            "config": config
        });
        print_json(&output)?;
        return Ok(config);
    }

    println!("📄 Config file: {}", config_path.display());
    println!("✅ Configuration saved successfully!");
    println!("\n📋 Configuration summary:");
    println!("   Store: {}", config.store_path.display());
    println!("   Log level: {:?}", config.log_level);
    println!("   Default task priority: {}", config.default_task_priority);
    println!(
        "   Default due time: {}",
        config
            .default_due_hours
            .map(|h| format!("{} hours", h))
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(config)
}

/// Handle the 'config show' command
pub async fn handle_config_show(config_path: &Path, json: bool) -> Result<()> {
    let config = Configuration::load_from_file(config_path)?;

    if json {
        print_json(&config)?;
    } else {
        println!("# {}", config_path.display());
        println!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
    }
    Ok(())
}

/// Handle the 'stats' command
pub async fn handle_stats(session: &Session, user: Option<String>, json: bool) -> Result<()> {
    let stats = session
        .engine
        .statistics(&session.store, user.as_deref())?;

    if json {
        print_json(&stats)?;
        return Ok(());
    }

    println!("Statistics");
    println!("==========");
    println!(
        "Definitions:   {} ({} active)",
        stats.definition_count, stats.active_definition_count
    );
    println!("Instances:     {}", stats.instance_count);
    for (status, count) in &stats.instances_by_status {
        println!("  {:<12} {}", status, count);
    }
    match user {
        Some(user) => println!("Pending tasks: {} for '{}'", stats.pending_task_count, user),
        None => println!("Pending tasks: {}", stats.pending_task_count),
    }
    Ok(())
}
