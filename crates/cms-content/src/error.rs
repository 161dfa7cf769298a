//! Error types for cms-content

/// Result type for cms-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving and mutating content objects
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {key} accessed before its data was fetched")]
    UnfetchedAccess { key: String },

    #[error("attribute {name:?} of {kind} is read-only")]
    ReadOnlyAttribute { kind: String, name: String },

    #[error("value for {name:?} violates a constraint: {reason}")]
    ConstraintViolation { name: String, reason: String },

    #[error("cannot derive an id for {kind}: {detail}")]
    CannotGetObjectId { kind: String, detail: String },

    #[error("invalid constructor data: {0}")]
    InvalidData(String),

    #[error("lookup request names neither id, data, nor parent ({0})")]
    UnknownArgument(String),

    #[error("path {path:?} diverges from data at segment {segment:?}")]
    PathDiverged { path: String, segment: String },

    #[error("cannot descend into non-object value at segment {segment:?} of path {path:?}")]
    PathNotObject { path: String, segment: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("client was released while an object still referenced it")]
    ClientReleased,

    #[error(transparent)]
    Gateway(#[from] cms_gateway::Error),
}
