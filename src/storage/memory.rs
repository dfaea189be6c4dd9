//! In-memory store backed by an ordered map.
//!
//! Used for tests and the `memory` backend. Supports fault injection so the
//! repository's failure paths can be exercised without a broken database:
//! - `set_available(false)` makes every call fail with `Unavailable`
//! - `fail_next_commits(n)` makes the next `n` commits report `Conflict`

use super::backend::{
    AtomicBatch, CommitOutcome, Entry, KvStore, Mutation, PrefixScan, StoreError, StoreResult,
    Versionstamp,
};
use super::keys::Key;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<Vec<u8>, (Vec<u8>, Versionstamp)>,
    versionstamp: Versionstamp,
}

/// Process-local store. Contents are lost when dropped.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    available: AtomicBool,
    forced_conflicts: AtomicUsize,
    commits: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            available: AtomicBool::new(true),
            forced_conflicts: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    /// Toggle availability. While unavailable every operation errors.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Force the next `count` commits to report a conflict.
    pub fn fail_next_commits(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of commits that applied.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys in order.
    pub fn keys(&self) -> Vec<Key> {
        self.lock()
            .map(|state| {
                state
                    .entries
                    .keys()
                    .map(|k| Key::from_bytes(k.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is closed".to_string()))
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &Key) -> StoreResult<Option<Entry>> {
        self.ensure_available()?;
        let state = self.lock()?;
        Ok(state
            .entries
            .get(key.as_bytes())
            .map(|(value, versionstamp)| Entry {
                key: key.clone(),
                value: value.clone(),
                versionstamp: *versionstamp,
            }))
    }

    fn scan_prefix<'a>(&'a self, prefix: &Key) -> StoreResult<PrefixScan<'a>> {
        self.ensure_available()?;
        Ok(Box::new(MemoryScan {
            store: self,
            lower: Bound::Included(prefix.as_bytes().to_vec()),
            end: prefix.prefix_end(),
            done: false,
        }))
    }

    fn commit(&self, batch: AtomicBatch) -> StoreResult<CommitOutcome> {
        self.ensure_available()?;
        if self.take_forced_conflict() {
            tracing::debug!("injected commit conflict");
            return Ok(CommitOutcome::Conflict);
        }

        let mut state = self.lock()?;
        for check in batch.checks() {
            let current = state.entries.get(check.key.as_bytes()).map(|(_, v)| *v);
            if current != check.versionstamp {
                return Ok(CommitOutcome::Conflict);
            }
        }

        state.versionstamp += 1;
        let versionstamp = state.versionstamp;
        for mutation in batch.mutations() {
            match mutation {
                Mutation::Put { key, value } => {
                    state
                        .entries
                        .insert(key.as_bytes().to_vec(), (value.clone(), versionstamp));
                }
                Mutation::Delete { key } => {
                    state.entries.remove(key.as_bytes());
                }
            }
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(CommitOutcome::Committed { versionstamp })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Walks the map one key at a time, re-locking per step.
struct MemoryScan<'a> {
    store: &'a MemoryStore,
    lower: Bound<Vec<u8>>,
    end: Vec<u8>,
    done: bool,
}

impl Iterator for MemoryScan<'_> {
    type Item = StoreResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.store.ensure_available() {
            self.done = true;
            return Some(Err(e));
        }
        let state = match self.store.lock() {
            Ok(state) => state,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let range = (self.lower.clone(), Bound::Excluded(self.end.clone()));
        let next = state
            .entries
            .range::<Vec<u8>, _>(range)
            .next()
            .map(|(k, (v, stamp))| (k.clone(), v.clone(), *stamp));
        drop(state);

        match next {
            Some((key, value, versionstamp)) => {
                self.lower = Bound::Excluded(key.clone());
                Some(Ok(Entry {
                    key: Key::from_bytes(key),
                    value,
                    versionstamp,
                }))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
