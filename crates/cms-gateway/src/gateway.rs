//! The request gateway
//!
//! Every call goes through [`Gateway::call`]: the gateway obtains a
//! session token (triggering or joining an authentication flow when
//! needed), injects it, and dispatches the request. An `AUTHREQUIRED`
//! response invalidates the stale token, re-authenticates, and retries
//! the call exactly once; any further challenge or an `ERROR` response
//! surfaces as a typed error without retry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::envelope::{Request, Response, ResponseCode};
use crate::error::{Error, Result};
use crate::session::{AuthState, Session, SessionToken};
use crate::transport::Transport;

/// Query parameter carrying the session secret
const SESSION_PARAM: &str = "sid";

pub struct Gateway {
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    session: Session,
    config: ClientConfig,
    // Serializes authentication flows; waiters park on the session watch.
    auth_flight: Mutex<()>,
}

impl Gateway {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            transport,
            authenticator,
            session: Session::new(),
            config,
            auth_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Issue an authenticated call.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let token = self.ensure_session().await?;
        let response = self.dispatch(&request, &token).await?;
        match response.code {
            ResponseCode::Ok => Ok(response),
            ResponseCode::Error => Err(self.rest_error(&request, response)),
            ResponseCode::AuthRequired => {
                tracing::debug!(url = %request.url, "stale session, re-authenticating");
                self.session.invalidate(&token);
                let token = self.ensure_session().await?;
                let retried = self.dispatch(&request, &token).await?;
                match retried.code {
                    ResponseCode::Ok => Ok(retried),
                    ResponseCode::Error => Err(self.rest_error(&request, retried)),
                    ResponseCode::AuthRequired => Err(Error::AuthenticationFailed(format!(
                        "fresh session rejected for {}",
                        request.url
                    ))),
                }
            }
        }
    }

    async fn dispatch(&self, request: &Request, token: &SessionToken) -> Result<Response> {
        let mut outgoing = request.clone();
        outgoing.url = join_url(&self.config.base_url, &request.url);
        outgoing
            .query
            .push((SESSION_PARAM.to_string(), token.secret.clone()));
        self.transport.dispatch(&outgoing).await
    }

    /// Return the current token, parking on an in-flight authentication
    /// or driving a new one when no session exists.
    async fn ensure_session(&self) -> Result<SessionToken> {
        loop {
            match self.session.state() {
                AuthState::Authenticated(token) => return Ok(token),
                AuthState::Authenticating => return self.session.wait_authenticated().await,
                AuthState::Unauthenticated | AuthState::Failed(_) => {
                    let _flight = self.auth_flight.lock().await;
                    // Someone else may have finished while we queued.
                    if let Some(token) = self.session.token() {
                        return Ok(token);
                    }
                    if !self.session.begin() {
                        continue;
                    }
                    let prefixed = Prefixed {
                        inner: self.transport.as_ref(),
                        base: &self.config.base_url,
                    };
                    return match self.authenticator.authenticate(&prefixed).await {
                        Ok(token) => {
                            self.session.complete(token.clone());
                            Ok(token)
                        }
                        Err(error) => {
                            self.session.fail(error.to_string());
                            Err(Error::AuthenticationFailed(error.to_string()))
                        }
                    };
                }
            }
        }
    }

    fn rest_error(&self, request: &Request, response: Response) -> Error {
        Error::Rest {
            url: request.url.clone(),
            message: response.message(),
        }
    }
}

fn join_url(base: &str, url: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// Resolves request urls against the base URL, so authenticators can
/// speak relative paths like every other caller.
struct Prefixed<'a> {
    inner: &'a dyn Transport,
    base: &'a str,
}

#[async_trait]
impl Transport for Prefixed<'_> {
    async fn dispatch(&self, request: &Request) -> Result<Response> {
        let mut outgoing = request.clone();
        outgoing.url = join_url(self.base, &request.url);
        self.inner.dispatch(&outgoing).await
    }
}
