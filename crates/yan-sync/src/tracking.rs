//! Remote-tracking heads: the last head seen for each remote branch.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::debug;
use yan_store::Commit;
use yan_types::Hash;

use crate::error::{SyncError, SyncResult};

/// `remote name -> (branch "org/app/name" -> last known head)`.
pub type RemoteTable = BTreeMap<String, BTreeMap<String, Hash<Commit>>>;

/// Persistence for the remote-tracking table.
pub trait RemoteStore: Send + Sync {
    fn read(&self) -> SyncResult<RemoteTable>;
    fn write(&self, table: &RemoteTable) -> SyncResult<()>;
}

/// Tracking table kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    table: RwLock<RemoteTable>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn read(&self) -> SyncResult<RemoteTable> {
        Ok(self.table.read().expect("lock poisoned").clone())
    }

    fn write(&self, table: &RemoteTable) -> SyncResult<()> {
        *self.table.write().expect("lock poisoned") = table.clone();
        Ok(())
    }
}

/// Tracking table kept in a JSON file.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so readers never observe a half-written table. A missing file
/// reads as an empty table.
#[derive(Clone, Debug)]
pub struct FileRemoteStore {
    path: PathBuf,
}

impl FileRemoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RemoteStore for FileRemoteStore {
    fn read(&self) -> SyncResult<RemoteTable> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SyncError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoteTable::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, table: &RemoteTable) -> SyncResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, table)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), remotes = table.len(), "wrote remote table");
        Ok(())
    }
}
