//! Explicit session state with an "authenticated" signal
//!
//! The session is the single process-wide piece of authentication state.
//! Callers that arrive while no token exists park on the watch channel
//! and resume when an authentication flow completes (or fails).

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// A server-issued session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub secret: String,
    pub issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Authentication lifecycle states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(SessionToken),
    Failed(String),
}

/// Process-wide session holder.
///
/// State transitions: `Unauthenticated -> Authenticating ->
/// Authenticated | Failed`, plus `invalidate` back to `Unauthenticated`
/// when the backend rejects a token as stale.
#[derive(Debug)]
pub struct Session {
    state: watch::Sender<AuthState>,
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self { state }
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The current token, if authenticated.
    pub fn token(&self) -> Option<SessionToken> {
        match &*self.state.borrow() {
            AuthState::Authenticated(token) => Some(token.clone()),
            _ => None,
        }
    }

    /// Mark an authentication flow as started.
    ///
    /// Returns `false` when a flow is already running or a token exists,
    /// in which case the caller should wait instead of authenticating.
    pub fn begin(&self) -> bool {
        let mut started = false;
        self.state.send_modify(|state| match state {
            AuthState::Unauthenticated | AuthState::Failed(_) => {
                *state = AuthState::Authenticating;
                started = true;
            }
            AuthState::Authenticating | AuthState::Authenticated(_) => {}
        });
        started
    }

    /// Complete the running flow with a fresh token, waking parked calls.
    pub fn complete(&self, token: SessionToken) {
        tracing::debug!("session authenticated");
        self.state.send_replace(AuthState::Authenticated(token));
    }

    /// Fail the running flow, rejecting parked calls.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "authentication failed");
        self.state.send_replace(AuthState::Failed(message));
    }

    /// Drop a stale token after the backend signalled "authentication
    /// required". A token other than `stale` is left in place: a
    /// concurrent re-authentication has already refreshed the session.
    pub fn invalidate(&self, stale: &SessionToken) {
        self.state.send_if_modified(|state| match state {
            AuthState::Authenticated(current) if current == stale => {
                *state = AuthState::Unauthenticated;
                true
            }
            _ => false,
        });
    }

    /// Park until the in-flight authentication resolves.
    pub async fn wait_authenticated(&self) -> Result<SessionToken> {
        let mut receiver = self.state.subscribe();
        loop {
            match &*receiver.borrow_and_update() {
                AuthState::Authenticated(token) => return Ok(token.clone()),
                AuthState::Failed(message) => {
                    return Err(Error::AuthenticationFailed(message.clone()));
                }
                AuthState::Unauthenticated | AuthState::Authenticating => {}
            }
            if receiver.changed().await.is_err() {
                return Err(Error::AuthenticationFailed(
                    "session dropped while waiting".to_string(),
                ));
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_exclusive() {
        let session = Session::new();
        assert!(session.begin());
        assert!(!session.begin());
        session.complete(SessionToken::new("s1"));
        assert!(!session.begin());
    }

    #[test]
    fn test_invalidate_ignores_refreshed_token() {
        let session = Session::new();
        session.begin();
        session.complete(SessionToken::new("old"));
        let old = session.token().unwrap();

        session.begin();
        session.complete(SessionToken::new("new"));
        session.invalidate(&old);
        assert_eq!(session.token().unwrap().secret, "new");
    }

    #[test]
    fn test_invalidate_drops_current_token() {
        let session = Session::new();
        session.begin();
        session.complete(SessionToken::new("s1"));
        let token = session.token().unwrap();
        session.invalidate(&token);
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_parked_call_resumes_on_completion() {
        let session = std::sync::Arc::new(Session::new());
        session.begin();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_authenticated().await })
        };
        session.complete(SessionToken::new("fresh"));
        let token = waiter.await.unwrap().unwrap();
        assert_eq!(token.secret, "fresh");
    }

    #[tokio::test]
    async fn test_parked_call_rejected_on_failure() {
        let session = std::sync::Arc::new(Session::new());
        session.begin();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_authenticated().await })
        };
        session.fail("bad credentials");
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
    }
}
