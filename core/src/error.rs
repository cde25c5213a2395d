//! Error types for the collaborators the engine consumes.
//!
//! Only collaborator faults are errors. Business outcomes of a purchase attempt are
//! values of [`crate::outcome::OutcomeState`].

use thiserror::Error;

/// Errors that can occur during durable store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Query or statement failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Could not obtain or keep a connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A row violated an invariant the engine relies on (negative stock,
    /// a conditional update touching more than one row).
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Errors that can occur during cache store operations.
///
/// Cache failures never affect correctness; the catalog logs them and falls back to
/// the durable store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Could not reach the cache.
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Cached bytes could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// The cache rejected a command.
    #[error("Cache command error: {0}")]
    CommandError(String),
}
