//! Closed error taxonomy shared by every layer of the store.
//!
//! Every fallible operation exposed by the record store, object storage
//! interface, and ingestion pipeline returns one of these variants. The set
//! is intentionally closed — new failure modes should be mapped onto an
//! existing variant rather than growing the enum, so that callers can match
//! exhaustively and the Worker Pool's retry classification (§4.10/§7 of the
//! spec) stays complete.

use thiserror::Error;

/// Result alias used throughout docvault.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed error set of the core storage and ingestion engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Addressable entity absent (record, folder, task).
    #[error("not found: {0}")]
    NotFound(String),

    /// A `create` was attempted with an id that already exists.
    #[error("duplicate id: {0}")]
    Duplicate(String),

    /// Advisory-unique checksum collided with an existing record.
    #[error("checksum conflict: {0}")]
    ChecksumConflict(String),

    /// Declared checksum disagreed with the computed one.
    #[error("checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum the caller declared up front.
        declared: String,
        /// Checksum actually computed from the payload stream.
        computed: String,
    },

    /// Startup recovery detected state that cannot be reconciled automatically.
    #[error("inconsistent store state: {0}")]
    Inconsistent(String),

    /// An on-disk artifact (shard file, index, WAL segment) failed its
    /// self-check (checksum mismatch, truncated record, bad header).
    #[error("corrupt on-disk artifact: {0}")]
    Corrupt(String),

    /// The advisory file lock could not be acquired within the timeout.
    #[error("lock unavailable: {0}")]
    LockUnavailable(String),

    /// Object storage transport or transient failure.
    #[error("object storage backend error: {0}")]
    Backend(String),

    /// The ingestion queue's high-water mark was exceeded.
    #[error("ingestion queue full (high water mark {0} reached)")]
    QueueFull(usize),

    /// The operation was aborted cooperatively via a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Transient classes are retried by the Worker Pool (spec §4.10/§7);
    /// everything else is surfaced immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::LockUnavailable(_))
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Error::NotFound(id.to_string())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Backend(format!("io error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::Backend("x".into()).is_transient());
        assert!(Error::LockUnavailable("x".into()).is_transient());
        assert!(!Error::NotFound("x".into()).is_transient());
        assert!(!Error::Corrupt("x".into()).is_transient());
        assert!(!Error::Cancelled.is_transient());
    }

    #[test]
    fn display_messages_are_stable() {
        let e = Error::ChecksumMismatch {
            declared: "aa".into(),
            computed: "bb".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("aa"));
        assert!(msg.contains("bb"));
    }
}
