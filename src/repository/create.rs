//! Create: mint an id and write the record with all its index entries.

use super::commit;
use super::error::{RepoResult, RepositoryError};
use super::index::put_index_entries;
use crate::models::NewTodo;
use crate::storage::keys::todo_key;
use crate::storage::{AtomicBatch, KvStore};
use chrono::Utc;
use uuid::Uuid;

/// Store a new todo and return its minted id.
///
/// The primary record and every index entry are written in one batch. The
/// batch also requires the primary key to be absent, so an id collision is
/// a commit failure rather than a silent overwrite.
pub fn create_todo<S: KvStore + ?Sized>(store: &S, input: NewTodo) -> RepoResult<String> {
    let id = Uuid::new_v4().to_string();
    let todo = input.into_todo(id.clone(), Utc::now());

    let mut batch = AtomicBatch::new();
    let primary = todo_key(&id);
    batch.check(primary.clone(), None);
    batch
        .put_json(primary, &todo)
        .map_err(RepositoryError::unexpected("creating todo"))?;
    put_index_entries(&mut batch, &todo).map_err(RepositoryError::unexpected("creating todo"))?;

    let versionstamp = commit(store, batch, "creating todo")?;
    tracing::debug!(id = %id, versionstamp, "created todo");
    Ok(id)
}
