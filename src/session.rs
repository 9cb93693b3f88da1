//! Persisted identity.
//!
//! Only the user, the authenticated flag and the bearer-token fallback
//! survive a restart. Loading flags and error messages are transient and
//! never written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::User;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug)]
enum Backing {
    File(PathBuf),
    Memory(Mutex<PersistedSession>),
}

/// Shared handle to the session file. Cloning shares the same backing.
#[derive(Debug, Clone)]
pub struct SessionStore {
    backing: Arc<Backing>,
}

impl SessionStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Arc::new(Backing::File(path.into())),
        }
    }

    /// Non-persistent store, for tests and `--no-session` runs.
    pub fn in_memory() -> Self {
        Self {
            backing: Arc::new(Backing::Memory(Mutex::new(PersistedSession::default()))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self.backing.as_ref() {
            Backing::File(p) => Some(p),
            Backing::Memory(_) => None,
        }
    }

    /// Read the persisted session. A missing file is an empty session; an
    /// unreadable or corrupt one is an error.
    pub fn load(&self) -> Result<PersistedSession> {
        match self.backing.as_ref() {
            Backing::File(path) => {
                if !path.exists() {
                    return Ok(PersistedSession::default());
                }
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read session file: {}", path.display()))?;
                if content.trim().is_empty() {
                    return Ok(PersistedSession::default());
                }
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse session file: {}", path.display()))
            }
            Backing::Memory(cell) => Ok(cell.lock().unwrap_or_else(PoisonError::into_inner).clone()),
        }
    }

    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        match self.backing.as_ref() {
            Backing::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create session directory: {}", parent.display())
                    })?;
                }
                let content =
                    serde_json::to_string_pretty(session).context("Failed to serialize session")?;
                // Write-then-rename so a crash never leaves a truncated file.
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, content)
                    .with_context(|| format!("Failed to write session file: {}", tmp.display()))?;
                std::fs::rename(&tmp, path)
                    .with_context(|| format!("Failed to replace session file: {}", path.display()))?;
                Ok(())
            }
            Backing::Memory(cell) => {
                *cell.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
                Ok(())
            }
        }
    }

    /// Forget everything. Idempotent.
    pub fn clear(&self) -> Result<()> {
        match self.backing.as_ref() {
            Backing::File(path) => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e)
                    .with_context(|| format!("Failed to remove session file: {}", path.display())),
            },
            Backing::Memory(cell) => {
                *cell.lock().unwrap_or_else(PoisonError::into_inner) = PersistedSession::default();
                Ok(())
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.load().ok().and_then(|s| s.token)
    }

    /// Read-modify-write helper.
    pub fn update(&self, f: impl FnOnce(&mut PersistedSession)) -> Result<()> {
        let mut session = self.load().unwrap_or_default();
        f(&mut session);
        self.save(&session)
    }
}
