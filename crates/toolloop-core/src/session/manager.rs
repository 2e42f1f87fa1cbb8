//! Conversation manager
//!
//! Holds the current session plus an in-memory cache of sessions backed by a
//! [`SessionStore`]. Recent sessions are preloaded; anything else is loaded
//! lazily the first time it is asked for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use super::export::{export_session, ExportFormat};
use super::persistence::SessionStore;
use super::types::{Message, Session};

/// Default number of search hits
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// A session matching a search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub session_id: String,
    pub summary: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate numbers over all known sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub average_messages_per_session: f64,
    pub role_distribution: BTreeMap<String, usize>,
    pub oldest_session: Option<DateTime<Utc>>,
    pub newest_session: Option<DateTime<Utc>>,
}

pub struct ConversationManager {
    store: Arc<dyn SessionStore>,
    sessions: HashMap<String, Session>,
    current: Option<String>,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            sessions: HashMap::new(),
            current: None,
        }
    }

    /// Create a manager and cache the `count` most recent stored sessions.
    /// A failing store only logs; the manager starts empty.
    pub fn with_preload(store: Arc<dyn SessionStore>, count: usize) -> Self {
        let mut manager = Self::new(store);
        match manager.store.list_recent(count) {
            Ok(sessions) => {
                debug!(count = sessions.len(), "Preloaded recent sessions");
                for session in sessions {
                    manager.sessions.insert(session.id.clone(), session);
                }
            }
            Err(e) => warn!("Failed to preload sessions: {}", e),
        }
        manager
    }

    pub fn cached_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref().and_then(|id| self.sessions.get(id))
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Start a new session and make it current
    pub fn create_session(&mut self) -> &Session {
        let session = Session::new();
        let id = session.id.clone();
        info!(session_id = %id, "Created session");
        self.sessions.insert(id.clone(), session);
        self.current = Some(id.clone());
        &self.sessions[&id]
    }

    fn current_mut(&mut self) -> &mut Session {
        let id = match self.current.as_ref().filter(|id| self.sessions.contains_key(*id)) {
            Some(id) => id.clone(),
            None => self.create_session().id.clone(),
        };
        // create_session above guarantees presence
        self.sessions.entry(id).or_default()
    }

    /// Append to the current session, creating one if needed
    pub fn append(&mut self, message: Message) -> &Session {
        let session = self.current_mut();
        session.append(message);
        session
    }

    /// Get a session from the cache, falling back to the store
    pub fn get_session(&mut self, session_id: &str) -> Result<Option<&Session>> {
        if !self.sessions.contains_key(session_id) {
            match self.store.load(session_id)? {
                Some(session) => {
                    self.sessions.insert(session_id.to_string(), session);
                }
                None => return Ok(None),
            }
        }
        Ok(self.sessions.get(session_id))
    }

    /// Make an existing session current
    pub fn resume(&mut self, session_id: &str) -> Result<&Session> {
        if self.get_session(session_id)?.is_none() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        self.current = Some(session_id.to_string());
        Ok(&self.sessions[session_id])
    }

    /// Persist one cached session
    pub fn save(&self, session_id: &str) -> Result<()> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        self.store.save(session)
    }

    /// Persist the current session, if any
    pub fn save_current(&self) -> Result<()> {
        match self.current() {
            Some(session) => self.store.save(session),
            None => Ok(()),
        }
    }

    /// Cached sessions merged with stored ones; the cached copy wins.
    fn all_sessions(&self) -> Result<Vec<Session>> {
        let mut merged: HashMap<String, Session> = self
            .store
            .list()?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        for (id, session) in &self.sessions {
            merged.insert(id.clone(), session.clone());
        }

        let mut sessions: Vec<Session> = merged.into_values().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Case-insensitive substring search, most recent first
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .all_sessions()?
            .into_iter()
            .filter(|s| s.contains_text(query))
            .take(limit)
            .map(|s| SearchHit {
                summary: s.summarize(),
                message_count: s.message_count(),
                updated_at: s.updated_at,
                session_id: s.id,
            })
            .collect())
    }

    pub fn statistics(&self) -> Result<SessionStatistics> {
        let sessions = self.all_sessions()?;
        let total_sessions = sessions.len();
        let total_messages: usize = sessions.iter().map(Session::message_count).sum();

        let mut role_distribution = BTreeMap::new();
        for message in sessions.iter().flat_map(|s| s.messages()) {
            *role_distribution.entry(message.role.to_string()).or_insert(0) += 1;
        }

        Ok(SessionStatistics {
            total_sessions,
            total_messages,
            average_messages_per_session: if total_sessions > 0 {
                total_messages as f64 / total_sessions as f64
            } else {
                0.0
            },
            role_distribution,
            oldest_session: sessions.iter().map(|s| s.created_at).min(),
            newest_session: sessions.iter().map(|s| s.created_at).max(),
        })
    }

    /// Export a session; `None` means the current one
    pub fn export(&mut self, session_id: Option<&str>, format: ExportFormat) -> Result<String> {
        let id = match session_id {
            Some(id) => id.to_string(),
            None => self
                .current
                .clone()
                .ok_or_else(|| Error::Session("no current session".to_string()))?,
        };
        let session = self
            .get_session(&id)?
            .ok_or_else(|| Error::SessionNotFound(id.clone()))?;
        export_session(session, format)
    }

    /// Delete sessions not updated in the last `days` days, except the
    /// current one. Returns how many were removed.
    pub fn clear_old_sessions(&mut self, days: u32) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let mut removed = 0;

        for session in self.all_sessions()? {
            if session.updated_at >= cutoff || self.current.as_deref() == Some(session.id.as_str()) {
                continue;
            }
            self.store.delete(&session.id)?;
            self.sessions.remove(&session.id);
            removed += 1;
        }

        if removed > 0 {
            info!(removed, days, "Cleared old sessions");
        }
        Ok(removed)
    }
}
