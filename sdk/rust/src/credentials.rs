//! Bearer token storage.
//!
//! The client never reads ambient state: whoever builds an [`ApiClient`]
//! hands it a [`CredentialStore`] explicitly.
//!
//! [`ApiClient`]: crate::ApiClient

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;

/// Errors from a credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Holds the bearer token attached to outgoing requests.
pub trait CredentialStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Result<Option<String>, CredentialError>;

    /// Replace the stored token.
    fn set(&self, token: &str) -> Result<(), CredentialError>;

    /// Forget the stored token.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Token kept in process memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.token.read().map_err(|_| CredentialError::Poisoned)?.clone())
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        *self.token.write().map_err(|_| CredentialError::Poisoned)? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.token.write().map_err(|_| CredentialError::Poisoned)? = None;
        Ok(())
    }
}

/// Token persisted to a file, cached in memory after first use.
///
/// Lookups hit the cache first and fall back to the file, so a token
/// written by an earlier process is picked up.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        if let Some(token) = self
            .cached
            .read()
            .map_err(|_| CredentialError::Poisoned)?
            .clone()
        {
            return Ok(Some(token));
        }

        let stored = match fs::read_to_string(&self.path) {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        if stored.is_empty() {
            return Ok(None);
        }

        *self.cached.write().map_err(|_| CredentialError::Poisoned)? = Some(stored.clone());
        Ok(Some(stored))
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        fs::write(&self.path, token).map_err(|e| self.io_error(e))?;
        *self.cached.write().map_err(|_| CredentialError::Poisoned)? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.cached.write().map_err(|_| CredentialError::Poisoned)? = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("bobyak-token-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_store_round() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_means_no_token() {
        let store = FileCredentialStore::new(temp_path());
        assert_eq!(store.get().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let path = temp_path();
        FileCredentialStore::new(&path).set("persisted").unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get().unwrap().as_deref(), Some("persisted"));

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(FileCredentialStore::new(&path).get().unwrap(), None);
    }

    #[test]
    fn test_file_store_trims_and_ignores_blank() {
        let path = temp_path();
        fs::write(&path, "  tok\n").unwrap();
        assert_eq!(FileCredentialStore::new(&path).get().unwrap().as_deref(), Some("tok"));

        fs::write(&path, "\n").unwrap();
        assert_eq!(FileCredentialStore::new(&path).get().unwrap(), None);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_store_prefers_cache() {
        let path = temp_path();
        let store = FileCredentialStore::new(&path);
        store.set("first").unwrap();

        // another writer changes the file; this instance keeps its copy
        fs::write(&path, "second").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("first"));

        store.clear().unwrap();
    }
}
