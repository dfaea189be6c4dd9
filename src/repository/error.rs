//! Typed failures returned by repository operations.

use crate::storage::StoreError;
use std::fmt;

/// Coarse classification of a [`RepositoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The id does not name a stored record.
    NotFound,
    /// The store rejected the atomic batch.
    CommitFailed,
    /// The store was unavailable or something else went wrong.
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::CommitFailed => "commit_failed",
            ErrorKind::Unexpected => "unexpected",
        };
        write!(f, "{}", s)
    }
}

/// Why a commit did not apply.
#[derive(Debug, thiserror::Error)]
pub enum CommitFailure {
    #[error("conflicting concurrent write")]
    Conflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error returned by every repository operation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Todo with id {id} not found")]
    NotFound { id: String },

    #[error("Failed to update todo {id}: {source}")]
    UpdateFailed {
        id: String,
        #[source]
        source: Box<RepositoryError>,
    },

    #[error("Failed to delete todo {id}: {source}")]
    DeleteFailed {
        id: String,
        #[source]
        source: Box<RepositoryError>,
    },

    #[error("Failed to commit transaction while {operation}: {cause}")]
    CommitFailed {
        operation: &'static str,
        #[source]
        cause: CommitFailure,
    },

    #[error("Unexpected error occurred while {context}: {source}")]
    Unexpected {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl RepositoryError {
    /// Classify the error, looking through update/delete wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound { .. } => ErrorKind::NotFound,
            RepositoryError::UpdateFailed { source, .. }
            | RepositoryError::DeleteFailed { source, .. } => source.kind(),
            RepositoryError::CommitFailed { .. } => ErrorKind::CommitFailed,
            RepositoryError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn unexpected(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| RepositoryError::Unexpected { context, source }
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;
