//! Session persistence - save and load sessions
//!
//! Each session is one pretty-printed JSON file named `<id>.json` inside the
//! sessions directory. Saves overwrite the whole file, so saving twice is the
//! same as saving once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use super::types::Session;

/// Storage backend for sessions
pub trait SessionStore: Send + Sync {
    /// Persist the full session, replacing any previous copy
    fn save(&self, session: &Session) -> Result<()>;

    /// Load a session by ID; `Ok(None)` when it does not exist
    fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// All stored sessions, most recently updated first
    fn list(&self) -> Result<Vec<Session>>;

    /// Remove a session; returns whether it existed
    fn delete(&self, session_id: &str) -> Result<bool>;

    /// The `limit` most recently updated sessions
    fn list_recent(&self, limit: usize) -> Result<Vec<Session>> {
        let mut sessions = self.list()?;
        sessions.truncate(limit);
        Ok(sessions)
    }
}

/// Get the default sessions directory path
pub fn default_sessions_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("toolloop"))
        .unwrap_or_else(|| PathBuf::from(".toolloop"))
        .join("sessions")
}

fn check_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid session id: {:?}", session_id)))
    }
}

/// JSON-file session store
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        check_session_id(session_id)?;
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.id)?;
        std::fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(session)?;
        // Write-then-rename so a crash never leaves a truncated session file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        debug!(session_id = %session.id, path = %path.display(), "Session saved");
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)?;
        let session: Session = serde_json::from_str(&json)?;
        Ok(Some(session))
    }

    fn list(&self) -> Result<Vec<Session>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match std::fs::read_to_string(&path) {
                    Ok(json) => match serde_json::from_str::<Session>(&json) {
                        Ok(session) => sessions.push(session),
                        Err(e) => warn!("Failed to parse session {:?}: {}", path, e),
                    },
                    Err(e) => warn!("Failed to read session {:?}: {}", path, e),
                }
            }
        }

        // Sort by updated_at descending (most recent first)
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    fn delete(&self, session_id: &str) -> Result<bool> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }
}

/// In-memory session store, used when history is disabled and in tests
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        self.sessions.lock().insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.lock().get(session_id).cloned())
    }

    fn list(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.lock().values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.lock().remove(session_id).is_some())
    }
}
