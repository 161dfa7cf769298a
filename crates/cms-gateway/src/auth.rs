//! Authentication flows
//!
//! Interactive (credentials) and single-sign-on flows both reduce to
//! "produce a session token through the transport". The gateway drives
//! whichever flow it was constructed with; parked calls never care which
//! one ran.

use async_trait::async_trait;
use serde_json::json;

use crate::envelope::{Request, Response, ResponseCode};
use crate::error::{Error, Result};
use crate::session::SessionToken;
use crate::transport::Transport;

/// Login credentials for the interactive flow
#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Produces a session token via the transport.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<SessionToken>;
}

/// Interactive login against `auth/login`
#[derive(Debug, Clone)]
pub struct CredentialsAuthenticator {
    credentials: Credentials,
}

impl CredentialsAuthenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Authenticator for CredentialsAuthenticator {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<SessionToken> {
        let request = Request::post(
            "auth/login",
            json!({
                "login": self.credentials.login,
                "password": self.credentials.password,
            }),
        );
        let response = transport.dispatch(&request).await?;
        token_from_response("auth/login", response)
    }
}

/// Single-sign-on login against a configurable endpoint
#[derive(Debug, Clone)]
pub struct SsoAuthenticator {
    endpoint: String,
}

impl SsoAuthenticator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Authenticator for SsoAuthenticator {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<SessionToken> {
        let request = Request::get(self.endpoint.clone());
        let response = transport.dispatch(&request).await?;
        token_from_response(&self.endpoint, response)
    }
}

fn token_from_response(url: &str, response: Response) -> Result<SessionToken> {
    if response.code != ResponseCode::Ok {
        return Err(Error::AuthenticationFailed(response.message()));
    }
    let secret = response
        .payload
        .get("sid")
        .and_then(|sid| sid.as_str())
        .ok_or_else(|| Error::MalformedResponse {
            url: url.to_string(),
            message: "login response carries no sid".to_string(),
        })?;
    Ok(SessionToken::new(secret))
}
