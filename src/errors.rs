//! Error taxonomy for the object database
//!
//! `ObjectNotFound` is the only "expected" failure: it drives the loose -> pack
//! fallback and is never logged as a failure. Every other kind aborts the
//! current operation and surfaces to the caller verbatim.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::path::PathBuf;

/// Errors produced by the object database engine.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    /// No loose file and no pack contains the object.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Malformed framed bytes, compressed stream or object body.
    #[error("format error: {0}")]
    Format(String),

    /// The SHA-1 of the stored bytes disagrees with the requested id.
    #[error("hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: ObjectId, actual: ObjectId },

    /// The stored object's type differs from the caller's expectation.
    #[error("object {oid} is a {actual}, not a {expected}")]
    TypeMismatch {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    /// Unrecognized pack index signature or version.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A pack index failed its checksum or a structural check.
    #[error("corrupt index for pack {pack}: {reason}")]
    CorruptIndex { pack: String, reason: String },

    /// A delta entry or instruction stream is malformed.
    #[error("corrupt delta: {0}")]
    CorruptDelta(String),

    /// A hex object id could not be parsed.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// A ref name violates the ref naming rules.
    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    /// The storage adapter itself failed.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OdbError {
    /// Whether this error only means "absent" rather than corruption or failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OdbError::ObjectNotFound(_))
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        OdbError::Format(reason.into())
    }

    pub(crate) fn corrupt_delta(reason: impl Into<String>) -> Self {
        OdbError::CorruptDelta(reason.into())
    }

    pub(crate) fn corrupt_index(pack: impl Into<String>, reason: impl Into<String>) -> Self {
        OdbError::CorruptIndex {
            pack: pack.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OdbError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for object database operations.
pub type OdbResult<T> = Result<T, OdbError>;
