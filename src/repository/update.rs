//! Update: rewrite a record and move its index entries in one batch.

use super::commit;
use super::error::{RepoResult, RepositoryError};
use super::index::{index_entries, put_index_entries};
use super::read::fetch_todo;
use crate::models::{Todo, TodoPatch};
use crate::storage::keys::todo_key;
use crate::storage::{AtomicBatch, KvStore};
use chrono::Utc;

/// Apply `patch` to the todo with `id` and return the stored result.
///
/// Index entries implied by the old state but not the new one are removed,
/// and the new set is written alongside the record. The batch is guarded by
/// the versionstamp the record was read at, so a concurrent writer makes
/// this commit fail instead of being overwritten.
pub fn update_todo<S: KvStore + ?Sized>(store: &S, id: &str, patch: TodoPatch) -> RepoResult<Todo> {
    let wrap = |source: RepositoryError| RepositoryError::UpdateFailed {
        id: id.to_string(),
        source: Box::new(source),
    };

    let (current, versionstamp) = fetch_todo(store, id, "updating todo").map_err(wrap)?;
    let updated = patch.apply(&current, Utc::now());

    let mut batch = AtomicBatch::new();
    let primary = todo_key(id);
    batch.check(primary.clone(), Some(versionstamp));

    let retained = index_entries(&updated);
    for stale in index_entries(&current).difference(&retained) {
        batch.delete(stale.clone());
    }
    put_index_entries(&mut batch, &updated)
        .map_err(RepositoryError::unexpected("updating todo"))
        .map_err(wrap)?;
    batch
        .put_json(primary, &updated)
        .map_err(RepositoryError::unexpected("updating todo"))
        .map_err(wrap)?;

    let versionstamp = commit(store, batch, "updating todo").map_err(wrap)?;
    tracing::debug!(id = %id, versionstamp, "updated todo");
    Ok(updated)
}
