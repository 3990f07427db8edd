//! Bearer-token storage.
//!
//! # Design
//! `TokenStore` is injected into `ApiClient` at construction rather than
//! read from a global. It sits on a small key/value `Storage` trait with two
//! scopes:
//! - `MemoryStorage` lives as long as the process (the "session" scope).
//! - `FileStorage` persists a JSON map to disk (the "durable" scope, used
//!   when the user asked to be remembered).
//!
//! At most one access token is stored per scope. The request core only ever
//! reads it; login, logout and account deletion are the only writers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::config::ClientConfig;

/// Storage key of the access token.
pub const TOKEN_STORAGE_KEY: &str = "kirini_auth_token";

/// Storage key of the refresh token issued alongside it.
pub const REFRESH_TOKEN_KEY: &str = "kirini_refresh_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String key/value storage with get/set/remove.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Storage persisted as a JSON object at `path`.
///
/// The file is read once on open and rewritten on every mutation. The
/// in-memory map only changes once the rewrite succeeded.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the storage file, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Which storage scope holds the token: the "remember me" choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Durable,
    Session,
}

impl StorageScope {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            StorageScope::Durable
        } else {
            StorageScope::Session
        }
    }
}

/// Holds the bearer token (and its refresh token) in one storage scope.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_token", &self.token().is_some())
            .finish()
    }
}

impl TokenStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Build the store for `scope`. The durable scope needs
    /// `config.token_file`; without one it falls back to memory.
    pub fn for_scope(scope: StorageScope, config: &ClientConfig) -> Result<Self, StorageError> {
        match (scope, &config.token_file) {
            (StorageScope::Durable, Some(path)) => Ok(Self::new(Arc::new(FileStorage::open(path)?))),
            (StorageScope::Durable, None) => {
                tracing::warn!("durable token storage requested without a token_file; using memory");
                Ok(Self::in_memory())
            }
            (StorageScope::Session, _) => Ok(Self::in_memory()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_STORAGE_KEY)
    }

    /// Store `token`, or clear the entry when it is `None` or empty.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        match token {
            Some(t) if !t.is_empty() => self.storage.set(TOKEN_STORAGE_KEY, t),
            _ => self.storage.remove(TOKEN_STORAGE_KEY),
        }
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_STORAGE_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    pub fn set_refresh_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        match token {
            Some(t) if !t.is_empty() => self.storage.set(REFRESH_TOKEN_KEY, t),
            _ => self.storage.remove(REFRESH_TOKEN_KEY),
        }
    }

    /// Drop both tokens (logout, account deletion).
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_STORAGE_KEY)?;
        self.storage.remove(REFRESH_TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("kirini-token-{name}-{}", uuid::Uuid::new_v4().simple()))
            .join("tokens.json")
    }

    #[test]
    fn set_then_get_token() {
        let store = TokenStore::in_memory();
        assert!(store.token().is_none());
        store.set_token(Some("abc")).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
    }

    #[test]
    fn set_token_none_clears_entry() {
        let store = TokenStore::in_memory();
        store.set_token(Some("abc")).unwrap();
        store.set_token(None).unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn set_token_empty_clears_entry() {
        let store = TokenStore::in_memory();
        store.set_token(Some("abc")).unwrap();
        store.set_token(Some("")).unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn clear_token_is_unconditional() {
        let store = TokenStore::in_memory();
        store.clear_token().unwrap();
        store.set_token(Some("abc")).unwrap();
        store.clear_token().unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn second_token_replaces_first() {
        let store = TokenStore::in_memory();
        store.set_token(Some("first")).unwrap();
        store.set_token(Some("second")).unwrap();
        assert_eq!(store.token().as_deref(), Some("second"));
    }

    #[test]
    fn clear_all_drops_refresh_token_too() {
        let store = TokenStore::in_memory();
        store.set_token(Some("access")).unwrap();
        store.set_refresh_token(Some("refresh")).unwrap();
        store.clear_all().unwrap();
        assert!(store.token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let path = scratch_file("reopen");

        let first = FileStorage::open(&path).unwrap();
        first.set(TOKEN_STORAGE_KEY, "durable-token").unwrap();
        drop(first);

        let second = FileStorage::open(&path).unwrap();
        assert_eq!(second.get(TOKEN_STORAGE_KEY).as_deref(), Some("durable-token"));
        second.remove(TOKEN_STORAGE_KEY).unwrap();

        let third = FileStorage::open(&path).unwrap();
        assert!(third.get(TOKEN_STORAGE_KEY).is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_storage_rejects_corrupt_file() {
        let path = scratch_file("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn session_scope_uses_memory() {
        let path = scratch_file("unused");
        let config = ClientConfig {
            token_file: Some(path.clone()),
            ..ClientConfig::default()
        };
        let store = TokenStore::for_scope(StorageScope::from_remember_me(false), &config).unwrap();
        store.set_token(Some("t")).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn durable_scope_writes_token_file() {
        let path = scratch_file("durable");
        let config = ClientConfig {
            token_file: Some(path.clone()),
            ..ClientConfig::default()
        };
        let store = TokenStore::for_scope(StorageScope::from_remember_me(true), &config).unwrap();
        store.set_token(Some("kept")).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(TOKEN_STORAGE_KEY));
        assert!(raw.contains("kept"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_write_leaves_stored_token_unchanged() {
        let path = scratch_file("blocked");
        let dir = path.parent().unwrap().to_path_buf();
        let store = TokenStore::new(Arc::new(FileStorage::open(&path).unwrap()));
        store.set_token(Some("old")).unwrap();

        // The parent directory turns into a plain file, so every rewrite fails.
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, "not a directory").unwrap();

        assert!(matches!(store.set_token(Some("new")), Err(StorageError::Io(_))));
        assert_eq!(store.token().as_deref(), Some("old"));
        assert!(store.clear_token().is_err());
        assert_eq!(store.token().as_deref(), Some("old"));
        let _ = fs::remove_file(&dir);
    }

    #[test]
    #[traced_test]
    fn durable_scope_without_file_falls_back_to_memory() {
        let store = TokenStore::for_scope(StorageScope::Durable, &ClientConfig::default()).unwrap();
        store.set_token(Some("volatile")).unwrap();
        assert_eq!(store.token().as_deref(), Some("volatile"));
        assert!(logs_contain("durable token storage requested without a token_file"));
    }

    #[test]
    fn debug_output_hides_token() {
        let store = TokenStore::in_memory();
        store.set_token(Some("secret-value")).unwrap();
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("has_token: true"));
    }
}
