//! Common error types for climbwatch

use thiserror::Error;

/// Common result type for climbwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the registry, models and time helpers
#[derive(Error, Debug)]
pub enum Error {
    /// Name does not match any registered branch
    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    /// Storage id does not match any registered branch
    #[error("Unknown branch storage id: {0}")]
    UnknownStorageId(i64),

    /// Timestamp text could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
