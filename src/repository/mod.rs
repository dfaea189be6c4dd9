//! Todo repository: records plus their secondary indexes.
//!
//! Every record lives under one primary key and is mirrored into index
//! entries that point back at its id:
//!
//! ```text
//! ["todo", id]                             -> Todo (JSON)
//! ["todo_by_project", project, id]         -> id
//! ["todo_by_context", context, id]         -> id
//! ["todo_by_priority", priority or "", id] -> id
//! ["todo_by_completion", bool, id]         -> id
//! ```
//!
//! Create, update and delete each build a single [`AtomicBatch`] holding the
//! primary write and all index maintenance, guarded by a versionstamp check
//! on the primary key. Either the whole batch lands or none of it does.
//!
//! Reads never write. Index queries resolve ids through point reads and
//! skip entries whose record is missing.

mod create;
mod delete;
pub mod error;
pub mod index;
mod read;
mod update;

pub use create::create_todo;
pub use delete::delete_todo;
pub use error::{CommitFailure, ErrorKind, RepoResult, RepositoryError};
pub use read::{
    get_all_todos, get_todo_by_id, get_todos_by_completion, get_todos_by_context,
    get_todos_by_priority, get_todos_by_project,
};
pub use update::update_todo;

use crate::storage::{AtomicBatch, CommitOutcome, KvStore, Versionstamp};

/// Commit `batch`, folding a rejected check or a store failure into
/// [`RepositoryError::CommitFailed`].
pub(crate) fn commit<S: KvStore + ?Sized>(
    store: &S,
    batch: AtomicBatch,
    operation: &'static str,
) -> RepoResult<Versionstamp> {
    match store.commit(batch) {
        Ok(CommitOutcome::Committed { versionstamp }) => Ok(versionstamp),
        Ok(CommitOutcome::Conflict) => {
            tracing::warn!(operation, "commit rejected by versionstamp check");
            Err(RepositoryError::CommitFailed {
                operation,
                cause: CommitFailure::Conflict,
            })
        }
        Err(e) => Err(RepositoryError::CommitFailed {
            operation,
            cause: CommitFailure::Store(e),
        }),
    }
}
