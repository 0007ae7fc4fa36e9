//! In-memory conversation sessions keyed by session id.

use crate::config::SessionConfig;
use crate::models::{Flashcard, Part, Role, Session, Turn};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Session key used when the caller does not identify a session.
pub const DEFAULT_SESSION_KEY: &str = "default_user";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::NotFound(anyhow::Error::new(err))
    }
}

/// A session together with the lock that serialises its conversation.
struct SessionSlot {
    session: Session,
    lock: Arc<Mutex<()>>,
}

/// Concurrency-safe session map.
///
/// Individual mutations are atomic per key. Callers that read history, call
/// the provider and then append hold the key's conversation lock for the
/// whole sequence. Locks live inside their session entry, so keys that never
/// uploaded media leave nothing behind. The map holds at most `max_sessions`
/// entries; idle sessions and, when full, the least recently updated one are
/// evicted when a new key is seeded.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionSlot>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_sessions: config.max_sessions.max(1),
            idle_ttl: config.idle_ttl(),
        }
    }

    /// Snapshot of the session for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Session> {
        self.sessions
            .get(key)
            .map(|entry| entry.value().session.clone())
    }

    /// Replace whatever session `key` had with a fresh one.
    ///
    /// An existing key keeps its conversation lock so in-flight chats stay
    /// serialised against the new session.
    pub fn reset(&self, key: &str, history: Vec<Turn>, flashcards: Vec<Flashcard>) {
        let session = Session::new(history, flashcards);

        if let Some(mut slot) = self.sessions.get_mut(key) {
            slot.session = session;
            return;
        }

        self.make_room(Utc::now());
        match self.sessions.entry(key.to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().session = session,
            Entry::Vacant(entry) => {
                entry.insert(SessionSlot {
                    session,
                    lock: Arc::new(Mutex::new(())),
                });
            }
        }
    }

    pub fn append_turn(&self, key: &str, role: Role, parts: Vec<Part>) -> Result<(), SessionError> {
        let mut slot = self
            .sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::NotFound(key.to_string()))?;
        slot.session.push_turn(Turn::new(role, parts));
        Ok(())
    }

    /// Lock serialising read-converse-append sequences for `key`.
    ///
    /// Only sessions that exist have a lock; unknown keys get `None`.
    pub fn conversation_lock(&self, key: &str) -> Option<Arc<Mutex<()>>> {
        self.sessions.get(key).map(|entry| entry.value().lock.clone())
    }

    /// Drop every session idle for longer than the configured time to live.
    /// Returns the number of sessions removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Utc::now())
    }

    fn evict_idle_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| !is_idle(&slot.session, now, self.idle_ttl));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    /// Ensure one more key fits, evicting idle sessions first and then the
    /// least recently updated ones.
    fn make_room(&self, now: DateTime<Utc>) {
        if self.sessions.len() < self.max_sessions {
            return;
        }

        self.evict_idle_at(now);

        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().session.updated_at)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.sessions.remove(&key);
                    tracing::info!(session = %key, "Evicted least recently used session");
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn is_idle(session: &Session, now: DateTime<Utc>, ttl: Duration) -> bool {
    (now - session.updated_at)
        .to_std()
        .map(|age| age > ttl)
        .unwrap_or(false)
}
