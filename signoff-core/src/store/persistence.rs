//! JSON file persistence for the store document
//!
//! Every access to the document happens under an advisory `fs2` lock on a
//! sibling `.lock` file: shared for reads, exclusive for a whole transaction.
//! The document itself is replaced by rename, so the lock must not live on it.

use super::StoreState;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Advisory lock on the store's lock file, released on drop
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Lock for reading; any number of readers may hold it
    pub fn shared(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_shared()
            .context("Failed to acquire read lock on workflow store")?;
        Ok(Self { file })
    }

    /// Lock for a read-modify-write cycle; excludes every other holder
    pub fn exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .context("Failed to acquire write lock on workflow store")?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "Failed to release workflow store lock");
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(sibling(path, ".lock"))
        .context("Failed to open workflow store lock file")
}

/// Load the store document; an empty file is an empty store.
/// Callers hold a [`StoreLock`].
pub fn load_state(path: &Path) -> Result<StoreState> {
    let file = File::open(path).context("Failed to open workflow store file")?;

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(file);
    reader
        .read_to_string(&mut contents)
        .context("Failed to read workflow store")?;

    if contents.trim().is_empty() {
        return Ok(StoreState::default());
    }

    serde_json::from_str(&contents).context("Failed to parse workflow store JSON")
}

/// Like [`load_state`], but a missing file is an empty store
pub fn load_or_default(path: &Path) -> Result<StoreState> {
    if path.exists() {
        load_state(path)
    } else {
        Ok(StoreState::default())
    }
}

/// Write the store document to a staging file, then rename it over the
/// original so readers never see a partial document.
/// Callers hold an exclusive [`StoreLock`].
pub fn save_state(path: &Path, state: &StoreState) -> Result<()> {
    let staging = staging_path(path);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&staging)
        .context("Failed to open workflow store file for writing")?;

    let json = serde_json::to_string_pretty(state).context("Failed to serialize workflow store")?;

    let mut writer = std::io::BufWriter::new(file);
    writer
        .write_all(json.as_bytes())
        .context("Failed to write workflow store")?;
    writer
        .flush()
        .context("Failed to flush workflow store to disk")?;
    writer
        .get_ref()
        .sync_all()
        .context("Failed to sync workflow store to disk")?;
    drop(writer);

    std::fs::rename(&staging, path).context("Failed to replace workflow store file")?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| "store.json".into());
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let state = StoreState {
            last_sequence: 7,
            ..StoreState::default()
        };
        save_state(&path, &state).unwrap();
        assert!(!staging_path(&path).exists());

        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded.last_sequence, 7);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let loaded = load_or_default(&dir.path().join("store.json")).unwrap();
        assert_eq!(loaded.last_sequence, 0);
    }

    #[test]
    fn test_shared_locks_coexist_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = StoreLock::shared(&path).unwrap();
        let second = StoreLock::shared(&path).unwrap();
        assert!(dir.path().join("store.json.lock").exists());
        assert!(open_lock_file(&path).unwrap().try_lock_exclusive().is_err());

        drop(first);
        drop(second);
        let exclusive = StoreLock::exclusive(&path).unwrap();
        assert!(open_lock_file(&path).unwrap().try_lock_shared().is_err());
        drop(exclusive);
        assert!(open_lock_file(&path).unwrap().try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "").unwrap();

        let loaded = load_state(&path).unwrap();
        assert!(loaded.instances.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_state(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse workflow store JSON"));
    }
}
