//! Error types for cms-gateway

/// Result type for cms-gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while issuing gateway calls
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("request to {url} failed: {message}")]
    Rest { url: String, message: String },

    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("malformed response payload from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
