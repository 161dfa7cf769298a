//! Transport seam between the gateway and an actual network stack

use async_trait::async_trait;

use crate::envelope::{Request, Response};
use crate::error::Result;

/// Dispatches envelopes to the REST backend.
///
/// Implementations are expected to be cheap to share (`Arc<dyn Transport>`)
/// and must not retry on their own; retry policy lives in the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: &Request) -> Result<Response>;
}
