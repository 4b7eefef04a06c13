//! Error types for nt_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nt_core operations.
#[derive(Error, Debug)]
pub enum NtError {
    /// File system or database I/O failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path the operation was acting on, if known.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error with no specific path available.
    #[error("I/O error: {0}")]
    PlainIo(#[from] std::io::Error),

    /// A pack file, index document, or YAML document could not be parsed.
    #[error("parse error in {}: {reason}", path.display())]
    ParseError {
        /// Path to the malformed document.
        path: PathBuf,
        /// Human-readable description.
        reason: String,
    },

    /// ObjectData envelope was corrupt or carried an unknown kind tag.
    #[error("decode error for object {oid}: {reason}")]
    DecodeError {
        /// OID of the object that failed to decode.
        oid: String,
        /// Human-readable description.
        reason: String,
    },

    /// A commit would overwrite an entry whose live state disagrees with
    /// what staging believed.
    #[error("conflict on {path}: {reason}")]
    ConflictError {
        /// Repository-relative path of the conflicting entry.
        path: String,
        /// Human-readable description.
        reason: String,
    },

    /// An OID is not present in the index.
    #[error("not found: {0}")]
    NotFound(String),

    /// A cooperative cancellation signal was observed.
    #[error("operation cancelled")]
    Cancelled,

    /// The repository lock is held by another process.
    #[error("repository locked by pid {pid}")]
    LockBusy {
        /// PID of the process holding the lock.
        pid: u32,
    },

    /// Hash verification failed while reading a pack file or blob.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Expected OID.
        expected: String,
        /// Actual computed OID.
        actual: String,
    },

    /// Invalid hex string while parsing an OID.
    #[error("invalid oid: {0}")]
    InvalidOid(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The embedded database mirror rejected an operation.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl NtError {
    /// Builds an `Io` variant tagged with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns a user-facing recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::LockBusy { .. } => {
                Some("Wait for the other process to finish, or remove .nt/index.lock if it is dead.")
            }
            Self::ConflictError { .. } => {
                Some("Run 'nt status' to see the conflicting entry, then 'nt add' or 'nt reset' it before committing again.")
            }
            Self::DecodeError { .. } => {
                Some("The object is corrupted. Run 'nt gc' after reconciling the source file to drop it.")
            }
            Self::ParseError { .. } => {
                Some("The document is malformed; restore it from version control or re-run 'nt add' on the source file.")
            }
            Self::NotFound(_) => Some("Check the OID with 'nt status' or 'nt cat-file' against a known entry."),
            Self::Cancelled => Some("Re-run the command; no partial state was written to disk."),
            Self::HashMismatch { .. } => {
                Some("The object on disk does not match its OID. Restore it from backup or run 'nt gc'.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for nt_core operations.
pub type Result<T> = std::result::Result<T, NtError>;
