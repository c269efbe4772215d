//! In-memory session tokens and the cookie helpers that carry them.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use http::header;
use tracing::{debug, info};
use uuid::Uuid;

use super::{AuthError, CredentialValidator, Identity};
use crate::context::Context;

struct Session {
    identity: Identity,
    expires_at: Instant,
}

/// Opaque session tokens mapped to identities.
///
/// Shared by every request thread; `DashMap` shards the map behind
/// read/write locks.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session and returns its token.
    pub fn create(&self, identity: Identity) -> String {
        let token = Uuid::new_v4().simple().to_string();
        debug!(user_id = %identity.user_id, "session created");
        self.sessions.insert(
            token.clone(),
            Session {
                identity,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops expired sessions, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, session| session.expires_at > now);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl CredentialValidator for SessionStore {
    fn validate(&self, credential: &str) -> Result<Identity, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::EmptyCredential);
        }

        // the map guard must be released before `remove`
        let expired = match self.sessions.get(credential) {
            None => return Err(AuthError::UnknownSession),
            Some(session) if session.expires_at > Instant::now() => {
                return Ok(session.identity.clone());
            }
            Some(_) => true,
        };
        if expired {
            self.sessions.remove(credential);
        }
        Err(AuthError::UnknownSession)
    }
}

/// Adds a `Set-Cookie` header carrying the session token.
pub fn set_session_cookie(ctx: &mut Context, name: &str, token: &str, ttl: Duration) {
    let cookie = format!(
        "{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    );
    ctx.append_header(header::SET_COOKIE, &cookie);
}

/// Adds a `Set-Cookie` header that expires the session cookie.
pub fn clear_session_cookie(ctx: &mut Context, name: &str) {
    let cookie = format!(
        "{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    );
    ctx.append_header(header::SET_COOKIE, &cookie);
}
