//! Configuration, store and engine for one CLI invocation

use anyhow::{Context, Result};
use signoff_core::models::{Configuration, Values};
use signoff_core::{WorkflowEngine, WorkflowStore};
use std::path::PathBuf;
use uuid::Uuid;

/// Everything a command handler needs
pub struct Session {
    pub store: WorkflowStore,
    pub engine: WorkflowEngine,
}

impl Session {
    /// Open the store and build the engine described by `config`
    pub fn from_config(config: Configuration) -> Result<Self> {
        if let Err(errors) = config.validate() {
            anyhow::bail!("Invalid configuration: {}", errors.join("; "));
        }
        let store = WorkflowStore::open(&config.store_path).with_context(|| {
            format!(
                "Failed to open workflow store {}",
                config.store_path.display()
            )
        })?;
        let engine = WorkflowEngine::from_config(&config);
        Ok(Self { store, engine })
    }
}

/// The configuration file to use: the explicit path, or the XDG default
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Configuration::default_config_path(),
    }
}

/// Parse an ID argument
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .with_context(|| format!("Invalid {} ID '{}' (expected UUID)", what, raw))
}

/// Parse a JSON object argument; `@path` reads the object from a file
pub fn parse_values(raw: &str) -> Result<Values> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read values file {}", path))?,
        None => raw.to_string(),
    };
    match serde_json::from_str::<serde_json::Value>(&text).context("Values must be valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("Values must be a JSON object, got {}", other),
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// START -> APPROVAL(role managers) -> END
    pub const LEAVE: &str = r#"
name: Leave request
category: hr
node_tree:
  key: start
  type: START
  child:
    key: manager
    name: Manager approval
    type: APPROVAL
    assignees:
      type: roles
      ids: [managers]
    child:
      key: end
      type: END
"#;

    /// Session over a store inside a fresh temporary directory
    pub fn temp_session() -> (TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Configuration {
            store_path: dir.path().join("store.json"),
            ..Configuration::default()
        };
        config
            .directory
            .roles
            .insert("managers".to_string(), vec!["boss".to_string()]);
        let session = Session::from_config(config).unwrap();
        (dir, session)
    }

    #[test]
    fn test_parse_values() {
        let values = parse_values(r#"{"amount": 10}"#).unwrap();
        assert_eq!(values.get("amount"), Some(&serde_json::json!(10)));

        assert!(parse_values("[1, 2]").is_err());
        assert!(parse_values("not json").is_err());
    }

    #[test]
    fn test_parse_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        std::fs::write(&path, r#"{"reason": "travel"}"#).unwrap();

        let values = parse_values(&format!("@{}", path.display())).unwrap();
        assert_eq!(values.get("reason"), Some(&serde_json::json!("travel")));
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "task").unwrap(), id);
        let err = parse_id("nope", "task").unwrap_err();
        assert!(err.to_string().contains("Invalid task ID"));
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = Configuration {
            store_path: PathBuf::new(),
            ..Configuration::default()
        };
        let err = Session::from_config(config).err().unwrap();
        assert!(err.to_string().contains("store_path"));
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Configuration::load_from_file(&path).unwrap();
        assert_eq!(config.default_task_priority, 0);
    }
}
