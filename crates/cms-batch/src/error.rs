//! Error types for cms-batch

/// Result type for cms-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when configuring a batcher
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}
