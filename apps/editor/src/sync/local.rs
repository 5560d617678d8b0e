//! Per-user local persistence: the serialized `EditorState` and the id of the
//! remote record the session is bound to.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::document::EditorState;

const STATE_KEY_PREFIX: &str = "resume-editor-v1";
const ACTIVE_ID_KEY_PREFIX: &str = "resume-editor-active-id";

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("Local store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value storage surviving the session (browser-style local storage).
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Backends
// ────────────────────────────────────────────────────────────────────────────

/// One file per key under a directory.
pub struct FileLocalStore {
    root: PathBuf,
}

impl FileLocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Escapes every byte outside `[A-Za-z0-9.-]` as `_` plus two hex digits,
    /// so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
                file_name.push(char::from(byte));
            } else {
                file_name.push('_');
                file_name.push_str(&hex::encode([byte]));
            }
        }
        self.root.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        // Readers see the old file or the new one, never a partial write.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-user view
// ────────────────────────────────────────────────────────────────────────────

/// The two local keys owned by one user, over any [`LocalStore`].
#[derive(Clone)]
pub struct LocalPersistence {
    store: Arc<dyn LocalStore>,
    user_id: String,
}

impl LocalPersistence {
    pub fn new(store: Arc<dyn LocalStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn state_key(&self) -> String {
        state_key(&self.user_id)
    }

    pub fn active_id_key(&self) -> String {
        active_id_key(&self.user_id)
    }

    /// The stored state, or `None` when nothing usable is stored. Read and
    /// decode failures are logged, never returned.
    pub async fn load_state(&self) -> Option<EditorState> {
        let raw = match self.store.get(&self.state_key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read local state for user {}: {e}", self.user_id);
                return None;
            }
        };

        match EditorState::from_json(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt local state for user {}: {e}", self.user_id);
                None
            }
        }
    }

    /// Replaces the stored state wholesale.
    pub async fn save_state(&self, state: &EditorState) -> Result<(), LocalStoreError> {
        let json = state.to_json()?;
        self.store.set(&self.state_key(), &json).await?;
        debug!("Saved local state for user {} ({} bytes)", self.user_id, json.len());
        Ok(())
    }

    pub async fn read_active_id(&self) -> Option<String> {
        match self.store.get(&self.active_id_key()).await {
            Ok(id) => id.filter(|id| !id.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read active resume id for user {}: {e}", self.user_id);
                None
            }
        }
    }

    pub async fn write_active_id(&self, id: &str) -> Result<(), LocalStoreError> {
        self.store.set(&self.active_id_key(), id).await
    }
}

pub fn state_key(user_id: &str) -> String {
    format!("{STATE_KEY_PREFIX}:{user_id}")
}

pub fn active_id_key(user_id: &str) -> String {
    format!("{ACTIVE_ID_KEY_PREFIX}:{user_id}")
}
