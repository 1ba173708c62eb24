//! Error types for atlas-collections
//!
//! Provides a unified error type for all operations.
//!
//! Absence is never an error: a missing collection, member or key surfaces
//! as `None`, an empty collection, `false`, `0` or `-1` from accessors.

use thiserror::Error;

/// Result type alias using CollectionError
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Unified error type for collection and store operations
#[derive(Debug, Error)]
pub enum CollectionError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("Unknown column family: {0}")]
    UnknownColumnFamily(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Key / Layout Errors
    // -------------------------------------------------------------------------
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Metadata type mismatch: expected {expected}, found tag {found}")]
    TypeMismatch { expected: &'static str, found: u8 },

    /// Sorted-set member index and score index disagree
    #[error("Inconsistent sorted-set index for member {member:?} (score {score})")]
    InconsistentPairedIndex { member: Vec<u8>, score: i64 },

    #[error("Bit index {0} is outside 0..=i64::MAX")]
    BitIndexOutOfRange(u64),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for CollectionError {
    fn from(e: bincode::Error) -> Self {
        CollectionError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(e: serde_json::Error) -> Self {
        CollectionError::Serialization(e.to_string())
    }
}
