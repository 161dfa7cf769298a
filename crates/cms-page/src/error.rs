//! Error types for cms-page

/// Result type for cms-page operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during page synchronization
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no element with id {id:?} in the document")]
    MissingElement { id: String },

    #[error("malformed render payload: {0}")]
    RenderPayload(String),

    #[error("malformed tag payload: {0}")]
    TagPayload(String),

    #[error(transparent)]
    Content(#[from] cms_content::Error),

    #[error(transparent)]
    Gateway(#[from] cms_gateway::Error),
}
