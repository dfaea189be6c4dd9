//! Derivation of the secondary-index entries implied by a record.

use crate::models::Todo;
use crate::storage::keys::{
    completion_index_key, context_index_key, priority_index_key, project_index_key,
};
use crate::storage::{AtomicBatch, Key, StoreResult};
use std::collections::BTreeSet;

/// Every index entry key that should point at `todo`.
///
/// Duplicate labels collapse to one entry, so the set is exact: one key per
/// distinct project, one per distinct context, one priority bucket and one
/// completion bucket.
pub fn index_entries(todo: &Todo) -> BTreeSet<Key> {
    let mut entries = BTreeSet::new();
    for project in &todo.projects {
        entries.insert(project_index_key(project).child(&todo.id));
    }
    for context in &todo.contexts {
        entries.insert(context_index_key(context).child(&todo.id));
    }
    entries.insert(priority_index_key(todo.priority).child(&todo.id));
    entries.insert(completion_index_key(todo.completed).child(&todo.id));
    entries
}

/// Queue a put of every index entry for `todo`. Entry values are the id.
pub fn put_index_entries(batch: &mut AtomicBatch, todo: &Todo) -> StoreResult<()> {
    for key in index_entries(todo) {
        batch.put_json(key, &todo.id)?;
    }
    Ok(())
}

/// Queue a delete of every index entry for `todo`.
pub fn delete_index_entries(batch: &mut AtomicBatch, todo: &Todo) {
    for key in index_entries(todo) {
        batch.delete(key);
    }
}
