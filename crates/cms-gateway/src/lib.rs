//! Authenticated request gateway for the CMS client
//!
//! This crate carries the network-facing half of the client core:
//!
//! - **Envelope**: the transport-agnostic request/response shape the core
//!   exchanges with the REST backend
//! - **Transport**: the seam behind which an actual HTTP stack lives;
//!   the core never issues HTTP itself
//! - **Session**: explicit process-wide authentication state with an
//!   "authenticated" signal that parked calls subscribe to
//! - **Gateway**: token injection, single-flight re-authentication, and
//!   the retry-exactly-once policy for authentication challenges
//!
//! # Architecture
//!
//! ```text
//!   ContentObject / Page
//!           |
//!        Gateway ---- Session ---- Authenticator
//!           |
//!       Transport (injected)
//! ```

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod session;
pub mod transport;

pub use auth::{Authenticator, Credentials, CredentialsAuthenticator, SsoAuthenticator};
pub use config::{AuthSection, ClientConfig};
pub use envelope::{Method, Request, Response, ResponseCode};
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use session::{AuthState, Session, SessionToken};
pub use transport::Transport;
