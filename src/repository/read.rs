//! Read path: point lookups, full scans and index-driven queries.

use super::error::{RepoResult, RepositoryError};
use crate::models::{Priority, Todo};
use crate::storage::keys::{
    completion_index_key, context_index_key, priority_index_key, project_index_key, todo_key,
    todo_prefix,
};
use crate::storage::{Key, KvStore, Versionstamp};

/// Fetch a record together with the versionstamp it was read at.
pub(crate) fn fetch_todo<S: KvStore + ?Sized>(
    store: &S,
    id: &str,
    context: &'static str,
) -> RepoResult<(Todo, Versionstamp)> {
    let unexpected = RepositoryError::unexpected(context);
    match store.get(&todo_key(id)) {
        Ok(Some(entry)) => {
            let todo = entry.decode::<Todo>().map_err(unexpected)?;
            Ok((todo, entry.versionstamp))
        }
        Ok(None) => Err(RepositoryError::NotFound { id: id.to_string() }),
        Err(e) => Err(unexpected(e)),
    }
}

/// Get one todo by id.
pub fn get_todo_by_id<S: KvStore + ?Sized>(store: &S, id: &str) -> RepoResult<Todo> {
    fetch_todo(store, id, "getting todo").map(|(todo, _)| todo)
}

/// Every stored todo, in key order.
pub fn get_all_todos<S: KvStore + ?Sized>(store: &S) -> RepoResult<Vec<Todo>> {
    let context = "getting all todos";
    let scan = store
        .scan_prefix(&todo_prefix())
        .map_err(RepositoryError::unexpected(context))?;

    let mut todos = Vec::new();
    for entry in scan {
        let entry = entry.map_err(RepositoryError::unexpected(context))?;
        todos.push(
            entry
                .decode::<Todo>()
                .map_err(RepositoryError::unexpected(context))?,
        );
    }
    Ok(todos)
}

/// Todos carrying `project`; `None` returns every todo.
pub fn get_todos_by_project<S: KvStore + ?Sized>(
    store: &S,
    project: Option<&str>,
) -> RepoResult<Vec<Todo>> {
    match project {
        Some(project) => resolve_index(
            store,
            &project_index_key(project),
            "getting todos by project",
        ),
        None => get_all_todos(store),
    }
}

/// Todos carrying `context`; `None` returns every todo.
pub fn get_todos_by_context<S: KvStore + ?Sized>(
    store: &S,
    context: Option<&str>,
) -> RepoResult<Vec<Todo>> {
    match context {
        Some(context) => resolve_index(
            store,
            &context_index_key(context),
            "getting todos by context",
        ),
        None => get_all_todos(store),
    }
}

/// Todos with `priority`; `None` returns every todo, prioritized or not.
///
/// Records without a priority live in their own bucket, so they show up
/// here only through the `None` fallback.
pub fn get_todos_by_priority<S: KvStore + ?Sized>(
    store: &S,
    priority: Option<Priority>,
) -> RepoResult<Vec<Todo>> {
    match priority {
        Some(priority) => resolve_index(
            store,
            &priority_index_key(Some(priority)),
            "getting todos by priority",
        ),
        None => get_all_todos(store),
    }
}

/// Todos in one completion state.
pub fn get_todos_by_completion<S: KvStore + ?Sized>(
    store: &S,
    completed: bool,
) -> RepoResult<Vec<Todo>> {
    resolve_index(
        store,
        &completion_index_key(completed),
        "getting todos by completion status",
    )
}

/// Walk an index prefix and load the records its entries point at.
///
/// Entries whose record is gone are skipped with a warning rather than
/// failing the whole listing.
fn resolve_index<S: KvStore + ?Sized>(
    store: &S,
    prefix: &Key,
    context: &'static str,
) -> RepoResult<Vec<Todo>> {
    let scan = store
        .scan_prefix(prefix)
        .map_err(RepositoryError::unexpected(context))?;

    let mut todos = Vec::new();
    for entry in scan {
        let entry = entry.map_err(RepositoryError::unexpected(context))?;
        let id: String = entry
            .decode()
            .map_err(RepositoryError::unexpected(context))?;

        match store.get(&todo_key(&id)) {
            Ok(Some(record)) => todos.push(
                record
                    .decode::<Todo>()
                    .map_err(RepositoryError::unexpected(context))?,
            ),
            Ok(None) => {
                tracing::warn!(index = %entry.key, id = %id, "skipping index entry with no record");
            }
            Err(e) => return Err(RepositoryError::unexpected(context)(e)),
        }
    }
    Ok(todos)
}
