// # File Runtime Store
//
// File-based implementation of RuntimeStore with crash recovery.
//
// ## Purpose
//
// Persists the per-instance runtime record across process restarts so a
// re-invoked operation recognizes the droplet it already manages.
//
// ## Crash Recovery
//
// - Atomic writes: write to a temp file, then rename over the real one
// - Automatic backup: the previous good state is kept in a `.backup` file
// - Corruption detection: JSON is validated on load
// - Recovery: a corrupted main file falls back to the backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "resource_id": 12345,
//     "resource_context": { "deployment_id": "staging", ... },
//     "resource_properties": { "region": "nyc3", ... }
//   }
// }
// ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::RuntimeStore;

/// State file format version, for future migration
const STATE_FILE_VERSION: &str = "1.0";

/// File-backed runtime store with atomic writes and backup recovery
///
/// Every `set`/`remove` is written through to disk immediately; there is no
/// write buffering, so a crash loses at most the in-flight write, never a
/// completed one.
#[derive(Debug)]
pub struct FileRuntimeStore {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

/// Serializable state file layout
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    entries: HashMap<String, Value>,
}

impl FileRuntimeStore {
    /// Create or load a file runtime store
    ///
    /// Loads existing state if the file is present, recovering from the
    /// backup if the main file is corrupted. Parent directories are created
    /// as needed.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::store(format!(
                        "failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Load entries, falling back to the backup on corruption
    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, Value>, Error> {
        if !path.exists() {
            tracing::debug!("state file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("failed to read state file {}: {}", path.display(), e))
        })?;

        match Self::parse(&content) {
            Ok(entries) => {
                tracing::debug!("loaded state file: {} entries", entries.len());
                Ok(entries)
            }
            Err(parse_err) => {
                tracing::warn!(
                    "state file {} appears corrupted: {}; attempting recovery from backup",
                    path.display(),
                    parse_err
                );

                let backup = Self::backup_path(path);
                if !backup.exists() {
                    tracing::warn!("no backup file found, starting with empty state");
                    return Ok(HashMap::new());
                }

                let backup_content = fs::read_to_string(&backup).await.map_err(|e| {
                    Error::store(format!(
                        "failed to read backup file {}: {}",
                        backup.display(),
                        e
                    ))
                })?;

                match Self::parse(&backup_content) {
                    Ok(entries) => {
                        tracing::info!("recovered state from backup: {} entries", entries.len());
                        if let Err(e) = fs::copy(&backup, path).await {
                            tracing::error!("failed to restore state file from backup: {}", e);
                        }
                        Ok(entries)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "backup also corrupted: {}; starting with empty state",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
        }
    }

    fn parse(content: &str) -> Result<HashMap<String, Value>, Error> {
        let state_file: StateFileFormat = serde_json::from_str(content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "state file version mismatch: expected {}, got {}; loading anyway",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.entries)
    }

    /// Write the full entry map to disk atomically
    async fn write_state(&self) -> Result<(), Error> {
        let entries = self.entries.read().await.clone();

        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            entries,
        };

        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::store(format!("failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Keep the previous good state around before replacing it
        if self.path.exists() {
            let backup = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup).await {
                tracing::warn!("failed to create state backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("state written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RuntimeStore for FileRuntimeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let guard = self.entries.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        {
            let mut guard = self.entries.write().await;
            guard.insert(key.to_string(), value);
        }
        self.write_state().await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        {
            let mut guard = self.entries.write().await;
            guard.remove(key);
        }
        self.write_state().await
    }
}
