use cairn_types::{ObjectId, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Re-hashing the loaded bytes did not reproduce the requested address.
    #[error("integrity violation for {id}: content hashes to {computed}")]
    IntegrityViolation { id: ObjectId, computed: ObjectId },

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object stream could not be inflated or its header framing is bad.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A tree payload violates the record layout.
    #[error("malformed tree at byte {offset}: {reason}")]
    MalformedTree { offset: usize, reason: String },

    /// A commit payload has no parsable `tree` header.
    #[error("malformed commit: {0}")]
    MalformedCommit(String),

    /// The object kind cannot be written into a header.
    #[error("invalid object kind {0:?}")]
    InvalidKind(String),

    /// An address string could not be parsed.
    #[error("invalid object id: {0}")]
    InvalidId(TypeError),

    /// The object exists but is not of the expected kind.
    #[error("object {id} is a {actual}, expected {expected}")]
    KindMismatch {
        id: ObjectId,
        expected: String,
        actual: String,
    },
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidKind(kind) => Self::InvalidKind(kind),
            other => Self::InvalidId(other),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
