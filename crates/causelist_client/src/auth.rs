//! Session token handling.
//!
//! The token is read from its store at the moment of every call and never
//! cached, so a logout or a login from another process takes effect on the
//! next request.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use causelist_gateway::ForwardHeaders;
use causelist_logging::{cl_info, cl_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store write: {0}")]
    Persist(#[from] PersistError),
    #[error("token store format: {0}")]
    Format(String),
}

/// Persistent key/value slot holding the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, TokenStoreError>;
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned slot still holds a valid Option.
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.slot() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

/// RON file on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let session: PersistedSession =
            ron::from_str(&content).map_err(|err| TokenStoreError::Format(err.to_string()))?;
        Ok(Some(session.token).filter(|token| !token.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        let session = PersistedSession {
            token: token.to_string(),
        };
        let content = ron::ser::to_string_pretty(&session, ron::ser::PrettyConfig::new())
            .map_err(|err| TokenStoreError::Format(err.to_string()))?;
        write_atomic(&self.path, &content)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Read-mostly view of the current session, shared by every component.
#[derive(Clone)]
pub struct AuthContext {
    store: Arc<dyn TokenStore>,
}

impl AuthContext {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Current token, read fresh from the store. Unreadable stores count as logged out.
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(err) => {
                cl_warn!("Could not read session token: {}", err);
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// `authorization: Bearer <token>` when a token is stored, nothing otherwise.
    pub fn headers(&self) -> ForwardHeaders {
        self.token()
            .map(|token| ForwardHeaders::bearer(&token))
            .unwrap_or_default()
    }

    pub(crate) fn store_token(&self, token: &str) -> Result<(), TokenStoreError> {
        self.store.save(token)?;
        cl_info!("Session token stored");
        Ok(())
    }

    pub(crate) fn clear_token(&self) -> Result<(), TokenStoreError> {
        self.store.clear()?;
        cl_info!("Session token cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_empty_without_token() {
        let auth = AuthContext::new(Arc::new(MemoryTokenStore::new()));
        assert_eq!(auth.headers(), ForwardHeaders::default());
        assert!(!auth.has_token());
    }

    #[test]
    fn token_is_read_fresh_on_every_call() {
        let store = Arc::new(MemoryTokenStore::with_token("first"));
        let auth = AuthContext::new(store.clone());
        assert_eq!(auth.headers().authorization.as_deref(), Some("Bearer first"));

        store.save("second").unwrap();
        assert_eq!(auth.headers().authorization.as_deref(), Some("Bearer second"));

        store.clear().unwrap();
        assert_eq!(auth.token(), None);
    }
}
