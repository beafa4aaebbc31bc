// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted token storage.
//!
//! Plays the role of the browser's local storage: a flat string map holding
//! the `AccessToken` and `RefreshToken` entries. Two backends:
//! - `MemoryTokenStore` for tests and short-lived hosts
//! - `FileTokenStore`, a JSON file that survives restarts

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AuthError, Result};
use crate::models::{token_expiry, TokenPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::time_utils::format_utc_rfc3339;

/// Key/value storage for session credentials.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Read both halves of the stored credential pair.
    fn load(&self) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.get(ACCESS_TOKEN_KEY)?,
            refresh_token: self.get(REFRESH_TOKEN_KEY)?,
        })
    }

    /// Overwrite whichever halves `tokens` carries, logging their expiry.
    fn save(&self, tokens: &TokenPair) -> Result<()> {
        if let Some(refresh_token) = &tokens.refresh_token {
            log_expiry("refresh", refresh_token);
            self.set(REFRESH_TOKEN_KEY, refresh_token)?;
        }
        if let Some(access_token) = &tokens.access_token {
            log_expiry("access", access_token);
            self.set(ACCESS_TOKEN_KEY, access_token)?;
        }
        Ok(())
    }

    /// Drop the credential pair.
    fn clear(&self) -> Result<()> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)
    }

    /// No access token means no session.
    fn has_access_token(&self) -> Result<bool> {
        Ok(self.get(ACCESS_TOKEN_KEY)?.is_some())
    }
}

fn log_expiry(kind: &'static str, token: &str) {
    match token_expiry(token) {
        Some(expires_at) => tracing::debug!(
            kind,
            expires_at = %format_utc_rfc3339(expires_at),
            "Stored token expiry"
        ),
        None => tracing::debug!(kind, "Stored opaque token (no exp claim)"),
    }
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: DashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Token store persisted as a JSON object on disk.
///
/// Every mutation rewrites the whole file; the map only ever holds two keys.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileTokenStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AuthError::Storage(format!("corrupt token file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(AuthError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened token store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AuthError::Storage("token store lock poisoned".to_string()))?;
        let (value, dirty) = f(&mut entries);
        if dirty {
            self.persist(&entries)?;
        }
        Ok(value)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| AuthError::Storage(format!("failed to encode tokens: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AuthError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| (entries.get(key).cloned(), false))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            let changed = entries.get(key).map(String::as_str) != Some(value);
            if changed {
                entries.insert(key.to_string(), value.to_string());
            }
            ((), changed)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| ((), entries.remove(key).is_some()))
    }
}
