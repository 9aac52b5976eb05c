use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::store::Store;

/// Sessions older than this are rejected and pruned.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

struct Session {
    user_id: i64,
    issued_at: Instant,
}

/// Shared state handed to every handler: the store and the live sessions.
pub struct ServiceState<S> {
    pub store: S,
    sessions: DashMap<String, Session>,
    session_ttl: Duration,
}

impl<S: Store> ServiceState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn expired(&self, session: &Session) -> bool {
        session.issued_at.elapsed() >= self.session_ttl
    }

    /// Opens a session for the user and returns its token. Expired sessions are dropped first.
    pub fn start_session(&self, user_id: i64) -> String {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !self.expired(session));
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            debug!("pruned {pruned} expired sessions");
        }

        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                issued_at: Instant::now(),
            },
        );
        debug!("started session for user {user_id}");
        token
    }

    pub fn session_user(&self, token: &str) -> Option<i64> {
        let user_id = self.sessions.get(token).map(|entry| (entry.user_id, self.expired(&entry)));
        match user_id {
            Some((user_id, false)) => Some(user_id),
            Some((_, true)) => {
                // the read guard is released above; removing under it would deadlock
                self.sessions.remove_if(token, |_, session| self.expired(session));
                debug!("rejected expired session");
                None
            }
            None => None,
        }
    }

    pub fn end_session(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }
}
