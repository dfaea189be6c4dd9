//! Delete: remove a record and every index entry pointing at it.

use super::commit;
use super::error::{RepoResult, RepositoryError};
use super::index::delete_index_entries;
use super::read::fetch_todo;
use crate::storage::keys::todo_key;
use crate::storage::{AtomicBatch, KvStore};

/// Delete the todo with `id` and return the id.
pub fn delete_todo<S: KvStore + ?Sized>(store: &S, id: &str) -> RepoResult<String> {
    let wrap = |source: RepositoryError| RepositoryError::DeleteFailed {
        id: id.to_string(),
        source: Box::new(source),
    };

    let (current, versionstamp) = fetch_todo(store, id, "deleting todo").map_err(wrap)?;

    let mut batch = AtomicBatch::new();
    let primary = todo_key(id);
    batch.check(primary.clone(), Some(versionstamp));
    batch.delete(primary);
    delete_index_entries(&mut batch, &current);

    let versionstamp = commit(store, batch, "deleting todo").map_err(wrap)?;
    tracing::debug!(id = %id, versionstamp, "deleted todo");
    Ok(id.to_string())
}
