//! Durable client-side key/value storage.
//!
//! The front end keeps exactly three credential keys here: the credential
//! token, the refresh token and the signed-in user's id. They are always
//! written and removed together through `StoredSession`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Storage key of the credential token
pub const TOKEN_KEY: &str = "token";

/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key of the signed-in user's id
pub const USER_ID_KEY: &str = "userId";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access storage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value storage that outlives the process.
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed storage
// ============================================================================

/// Storage persisted as a pretty-printed JSON object.
/// Every mutation rewrites the file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the storage file, treating a missing file as empty storage.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "Client storage opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, contents).map_err(io_err)
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// Stored session
// ============================================================================

/// The credential keys written at sign-in and removed at sign-out or when
/// the backend rejects the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub refresh_token: String,
    pub user_id: String,
}

impl StoredSession {
    /// Read the session back. Returns `None` unless a token is present.
    pub fn load(storage: &dyn ClientStorage) -> Option<Self> {
        let token = storage.get(TOKEN_KEY)?;
        Some(Self {
            token,
            refresh_token: storage.get(REFRESH_TOKEN_KEY).unwrap_or_default(),
            user_id: storage.get(USER_ID_KEY).unwrap_or_default(),
        })
    }

    pub fn persist(&self, storage: &dyn ClientStorage) -> Result<(), StorageError> {
        storage.set(REFRESH_TOKEN_KEY, &self.refresh_token)?;
        storage.set(USER_ID_KEY, &self.user_id)?;
        // Token last: a reader never sees a token without its companions
        storage.set(TOKEN_KEY, &self.token)
    }

    /// Remove all three keys. Every removal is attempted even if an earlier
    /// one fails; the first error is returned.
    pub fn clear(storage: &dyn ClientStorage) -> Result<(), StorageError> {
        // Token first, so a partial failure cannot leave a usable token behind
        let results = [
            storage.remove(TOKEN_KEY),
            storage.remove(REFRESH_TOKEN_KEY),
            storage.remove(USER_ID_KEY),
        ];
        results.into_iter().collect()
    }
}
