//! Durable record of which deployment stages already completed. The store is
//! injected into the pipeline and scoped to one deployment run; every write
//! is persisted before the next stage starts, so a crash between stages
//! never loses a completed deployment.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy::primitives::Address;
use thiserror::Error;

pub type CheckpointResult<T> = Result<T, CheckpointError>;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Failed to access checkpoint file {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Checkpoint file {0} is corrupt, refusing to redeploy blindly: {1}")]
    Corrupt(String, #[source] serde_json::Error),

    #[error("Checkpoint value for {0} is not an address: {1}")]
    InvalidAddress(String, String),
}

/// One named address per completed stage output.
pub trait CheckpointStore: Send + Sync {
    fn get(&self, name: &str) -> Option<Address>;

    /// Must be durable before returning.
    fn set(&mut self, name: &str, addr: Address) -> CheckpointResult<()>;

    /// Only called once the whole pipeline succeeded.
    fn clear(&mut self) -> CheckpointResult<()>;
}

/// JSON file store, one file per deployment run. Writes go to a temp file
/// that is fsynced and renamed over the previous one.
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    entries: BTreeMap<String, Address>,
}

impl FileCheckpointStore {
    /// An unreadable or corrupt file is a hard error: continuing would
    /// redeploy stages whose contracts may already exist on chain.
    pub fn open(path: impl AsRef<Path>) -> CheckpointResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = BTreeMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| CheckpointError::Io(path.display().to_string(), e))?;
            let raw: BTreeMap<String, String> = serde_json::from_str(&content)
                .map_err(|e| CheckpointError::Corrupt(path.display().to_string(), e))?;

            for (name, value) in raw {
                let addr = Address::from_str(&value)
                    .map_err(|_| CheckpointError::InvalidAddress(name.clone(), value.clone()))?;
                entries.insert(name, addr);
            }
        }

        Ok(FileCheckpointStore { path, entries })
    }

    fn persist(&self) -> CheckpointResult<()> {
        let raw: BTreeMap<&String, String> = self
            .entries
            .iter()
            .map(|(k, v)| (k, format!("{v:?}")))
            .collect();
        let content = serde_json::to_string_pretty(&raw)
            .map_err(|e| CheckpointError::Corrupt(self.path.display().to_string(), e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let io_err = |e| CheckpointError::Io(self.path.display().to_string(), e);

        let mut tmp = fs::File::create(&tmp_path).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.sync_all().map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get(&self, name: &str) -> Option<Address> {
        self.entries.get(name).copied()
    }

    fn set(&mut self, name: &str, addr: Address) -> CheckpointResult<()> {
        self.entries.insert(name.to_string(), addr);
        self.persist()
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        self.entries.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| CheckpointError::Io(self.path.display().to_string(), e))?;
        }
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: BTreeMap<String, Address>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, name: &str) -> Option<Address> {
        self.entries.get(name).copied()
    }

    fn set(&mut self, name: &str, addr: Address) -> CheckpointResult<()> {
        self.entries.insert(name.to_string(), addr);
        Ok(())
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::address;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "backstop_checkpoint_{}_{}.json",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        let addr = address!("617b3a3528F9cDd6630fd3301B9c8911F7Bf063D");
        {
            let mut store = FileCheckpointStore::open(&path).unwrap();
            assert_eq!(store.get("createChildren"), None);
            store.set("createChildren", addr).unwrap();
        }

        // a fresh process sees the persisted entry
        let store = FileCheckpointStore::open(&path).unwrap();
        assert_eq!(store.get("createChildren"), Some(addr));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_clear_removes_file() {
        let path = temp_path("clear");
        let _ = fs::remove_file(&path);

        let mut store = FileCheckpointStore::open(&path).unwrap();
        store
            .set(
                "forkingManager",
                address!("617b3a3528F9cDd6630fd3301B9c8911F7Bf063D"),
            )
            .unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.get("forkingManager"), None);
    }

    #[test]
    fn test_corrupt_file_fails_fast() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let err = FileCheckpointStore::open(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt(_, _)));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_non_address_value_fails_fast() {
        let path = temp_path("badaddr");
        fs::write(&path, r#"{"createChildren": "not-an-address"}"#).unwrap();

        let err = FileCheckpointStore::open(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidAddress(_, _)));

        let _ = fs::remove_file(&path);
    }
}
