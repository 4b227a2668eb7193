//! Configuration data structures

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Upper bound for `default_due_hours` (one year)
const MAX_DUE_HOURS: u32 = 8760;

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Static role and department membership tables
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfig {
    /// Role ID to member user IDs
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    /// Department ID to member user IDs
    #[serde(default)]
    pub departments: BTreeMap<String, Vec<String>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// JSON store file
    pub store_path: PathBuf,
    /// Logging verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
    /// Priority given to newly created tasks
    #[serde(default)]
    pub default_task_priority: i32,
    /// When set, new tasks are due this many hours after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_due_hours: Option<u32>,
    /// Identity collaborator tables
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            log_level: LogLevel::Info,
            default_task_priority: 0,
            default_due_hours: None,
            directory: DirectoryConfig::default(),
        }
    }
}

/// `~/.signoff/store.json`, or `./.signoff/store.json` without a home directory
fn default_store_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".signoff").join("store.json")
}

impl Configuration {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Configuration =
                toml::from_str(&content).context("Failed to parse config TOML")?;
            Ok(config)
        } else {
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("signoff").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.store_path.as_os_str().is_empty() {
            errors.push("store_path cannot be empty".to_string());
        }

        if let Some(hours) = self.default_due_hours {
            if hours == 0 {
                errors.push("default_due_hours must be at least 1".to_string());
            }
            if hours > MAX_DUE_HOURS {
                errors.push(format!("default_due_hours cannot exceed {}", MAX_DUE_HOURS));
            }
        }

        for (role, members) in &self.directory.roles {
            if role.is_empty() {
                errors.push("directory.roles contains an empty role ID".to_string());
            }
            if members.iter().any(|m| m.is_empty()) {
                errors.push(format!("directory.roles.{} contains an empty user ID", role));
            }
        }
        for (dept, members) in &self.directory.departments {
            if dept.is_empty() {
                errors.push("directory.departments contains an empty department ID".to_string());
            }
            if members.iter().any(|m| m.is_empty()) {
                errors.push(format!("directory.departments.{} contains an empty user ID", dept));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
