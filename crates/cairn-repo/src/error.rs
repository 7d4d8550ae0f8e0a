use std::path::PathBuf;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No repository directory (with `HEAD` and `objects/`) at the path.
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    /// Object store failure.
    #[error("store error: {0}")]
    Store(#[from] cairn_store::StoreError),

    /// I/O error outside the object store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The configuration file cannot be parsed or holds invalid values.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path cannot be represented in a tree or is unsafe to materialize.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;
