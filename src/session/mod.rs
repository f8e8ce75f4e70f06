//! Authentication session gate.
//!
//! The session is an explicitly owned object over an injected store rather
//! than process-wide state. Time is passed in as milliseconds since the Unix
//! epoch so expiry is deterministic.

use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Io(#[from] io::Error),
    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Key-value persistence for session records.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        match fs::remove_file(self.path(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthRecord {
    is_authenticated: bool,
    timestamp: u64,
}

#[derive(Debug)]
pub struct AuthSession<S> {
    store: S,
    config: SessionConfig,
    authenticated: bool,
}

impl<S: SessionStore> AuthSession<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            authenticated: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-reads the stored record. Expired or unreadable records are removed.
    pub fn check(&mut self, now_ms: u64) -> bool {
        self.authenticated = match self.read_record() {
            Ok(Some(record)) if now_ms.saturating_sub(record.timestamp) < self.config.duration_ms => {
                true
            }
            Ok(Some(_)) => {
                tracing::debug!("session expired");
                self.discard();
                false
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session");
                self.discard();
                false
            }
        };
        self.authenticated
    }

    pub fn authenticate(&mut self, now_ms: u64) -> Result<(), SessionError> {
        let record = AuthRecord {
            is_authenticated: true,
            timestamp: now_ms,
        };
        self.store
            .set(&self.config.key, &serde_json::to_string(&record)?)?;
        self.authenticated = true;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.authenticated = false;
        self.store.remove(&self.config.key)
    }

    fn read_record(&self) -> Result<Option<AuthRecord>, SessionError> {
        match self.store.get(&self.config.key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn discard(&mut self) {
        if let Err(err) = self.store.remove(&self.config.key) {
            tracing::warn!(error = %err, "failed to remove session record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 60 * 60 * 1000;
    const KEY: &str = "document-chat-authenticated";

    #[test]
    fn test_fresh_store_is_unauthenticated() {
        let mut session = AuthSession::new(MemoryStore::new());
        assert!(!session.check(0));
    }

    #[test]
    fn test_session_valid_within_window() {
        let mut session = AuthSession::new(MemoryStore::new());
        session.authenticate(1_000).unwrap();
        assert!(session.check(1_000 + 23 * HOUR));
        let stored = session.store().get(KEY).unwrap().unwrap();
        assert_eq!(stored, r#"{"isAuthenticated":true,"timestamp":1000}"#);
    }

    #[test]
    fn test_expired_session_is_removed() {
        let mut session = AuthSession::new(MemoryStore::new());
        session.authenticate(0).unwrap();
        assert!(!session.check(24 * HOUR));
        assert!(session.store().get(KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_removed() {
        let mut store = MemoryStore::new();
        store.set(KEY, "not json").unwrap();
        let mut session = AuthSession::new(store);
        assert!(!session.check(0));
        assert!(session.store().get(KEY).unwrap().is_none());
    }

    #[test]
    fn test_logout() {
        let mut session = AuthSession::new(MemoryStore::new());
        session.authenticate(0).unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!session.check(1));
    }

    #[test]
    fn test_file_store_persists_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = AuthSession::new(FileStore::new(dir.path()));
        first.authenticate(5).unwrap();

        let mut second = AuthSession::new(FileStore::new(dir.path()));
        assert!(second.check(10));
        second.logout().unwrap();
        assert!(!dir.path().join(format!("{KEY}.json")).exists());
        second.logout().unwrap();
    }
}
