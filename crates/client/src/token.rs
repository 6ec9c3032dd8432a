//! Where the bearer token lives between requests.
//!
//! [`MemoryTokenStore`] lasts for the process; [`FileTokenStore`] keeps the
//! token in a small JSON file so a session survives restarts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ClientError;

/// Storage for the session token.
pub trait TokenStore: Send + Sync {
    /// The stored token, if any.
    fn load(&self) -> Option<SecretString>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::TokenStore` if the token could not be written.
    fn save(&self, token: &str) -> Result<(), ClientError>;

    /// Forget the token. Never fails; a token that cannot be removed is
    /// logged.
    fn clear(&self);
}

/// Token kept in memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<SecretString> {
        let guard = self.token.read().ok()?;
        guard
            .as_ref()
            .map(|t| SecretString::from(t.expose_secret().to_owned()))
    }

    fn save(&self, token: &str) -> Result<(), ClientError> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| ClientError::TokenStore("token lock poisoned".to_owned()))?;
        *guard = Some(SecretString::from(token.to_owned()));
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Token persisted as `{"token": "..."}` in a file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<SecretString> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StoredToken>(&raw) {
            Ok(stored) if !stored.token.is_empty() => Some(SecretString::from(stored.token)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Ignoring unreadable token file");
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|e| ClientError::TokenStore(e.to_string()))?;
        }
        let json = serde_json::to_string(&StoredToken {
            token: token.to_owned(),
        })
        .map_err(|e| ClientError::TokenStore(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ClientError::TokenStore(e.to_string()))
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "Failed to remove token file"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("gobble-token-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().is_none());

        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().expose_secret(), "abc");

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let path = temp_path();
        FileTokenStore::new(&path).save("tok-123").unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.load().unwrap().expose_secret(), "tok-123");

        reopened.clear();
        assert!(reopened.load().is_none());
        assert!(!path.exists());
        // Clearing twice is fine.
        reopened.clear();
    }

    #[test]
    fn test_file_store_ignores_garbage() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(FileTokenStore::new(&path).load().is_none());
    }
}
