//! Store adapter trait and the atomic batch it commits.
//!
//! This module provides the contract the repository relies on:
//! - `get` - point lookup returning the value and its versionstamp
//! - `scan_prefix` - lazy, key-ordered enumeration of a key prefix
//! - `commit` - all-or-nothing application of an [`AtomicBatch`]
//!
//! Implementations live next to this module:
//! - `SqliteStore` - SQLite-backed store (default)
//! - `MemoryStore` - in-process ordered map with fault injection

use super::keys::Key;
use std::fmt;

/// Monotonic commit counter assigned to every key a commit writes.
pub type Versionstamp = u64;

/// Errors raised by a store engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("value encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Vec<u8>,
    pub versionstamp: Versionstamp,
}

impl Entry {
    /// Decode the JSON value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// Precondition on a key that must hold for a batch to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub key: Key,
    /// Expected versionstamp; `None` requires the key to be absent.
    pub versionstamp: Option<Versionstamp>,
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put { key: Key, value: Vec<u8> },
    Delete { key: Key },
}

impl Mutation {
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// Checks plus mutations that commit together or not at all.
///
/// Mutations apply in insertion order, so a delete followed by a put of the
/// same key leaves the key present.
#[derive(Debug, Clone, Default)]
pub struct AtomicBatch {
    checks: Vec<Check>,
    mutations: Vec<Mutation>,
}

impl AtomicBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to be at `versionstamp` (or absent, for `None`).
    pub fn check(&mut self, key: Key, versionstamp: Option<Versionstamp>) -> &mut Self {
        self.checks.push(Check { key, versionstamp });
        self
    }

    /// Put a raw value.
    pub fn put(&mut self, key: Key, value: Vec<u8>) -> &mut Self {
        self.mutations.push(Mutation::Put { key, value });
        self
    }

    /// Put a JSON-encoded value.
    pub fn put_json<T: serde::Serialize + ?Sized>(
        &mut self,
        key: Key,
        value: &T,
    ) -> StoreResult<&mut Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.put(key, bytes))
    }

    pub fn delete(&mut self, key: Key) -> &mut Self {
        self.mutations.push(Mutation::Delete { key });
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty() && self.mutations.is_empty()
    }
}

/// Result of a commit attempt that reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every mutation applied at this versionstamp.
    Committed { versionstamp: Versionstamp },
    /// A check failed or a concurrent writer won; nothing applied.
    Conflict,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

/// Lazy, key-ordered iterator returned by [`KvStore::scan_prefix`].
pub type PrefixScan<'a> = Box<dyn Iterator<Item = StoreResult<Entry>> + 'a>;

/// Trait for transactional key-value engines.
///
/// Each engine must provide point reads, ordered prefix scans and
/// atomic batches with optimistic checks.
pub trait KvStore: Send + Sync {
    /// Read one key.
    fn get(&self, key: &Key) -> StoreResult<Option<Entry>>;

    /// Enumerate every entry whose key starts with `prefix`, in key order.
    ///
    /// The scan is not resumable; issue a new scan to start over.
    fn scan_prefix<'a>(&'a self, prefix: &Key) -> StoreResult<PrefixScan<'a>>;

    /// Apply a batch atomically.
    ///
    /// Returns `Conflict` without side effects when a check fails.
    fn commit(&self, batch: AtomicBatch) -> StoreResult<CommitOutcome>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Available store backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    /// SQLite database file (default)
    #[default]
    Sqlite,
    /// Process-local memory, discarded on exit
    Memory,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "file" | "default" => Some(Self::Sqlite),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys::todo_key;

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = AtomicBatch::new();
        batch
            .check(todo_key("a"), None)
            .delete(todo_key("a"))
            .put(todo_key("a"), b"1".to_vec());

        assert_eq!(batch.checks().len(), 1);
        assert!(matches!(batch.mutations()[0], Mutation::Delete { .. }));
        assert!(matches!(batch.mutations()[1], Mutation::Put { .. }));
        assert_eq!(batch.mutations()[1].key(), &todo_key("a"));
    }

    #[test]
    fn test_put_json_encodes_value() {
        let mut batch = AtomicBatch::new();
        batch.put_json(todo_key("a"), "a").unwrap();
        match &batch.mutations()[0] {
            Mutation::Put { value, .. } => assert_eq!(value, b"\"a\""),
            other => panic!("unexpected mutation: {:?}", other),
        }
    }

    #[test]
    fn test_backend_type_parse() {
        assert_eq!(BackendType::parse("SQLite"), Some(BackendType::Sqlite));
        assert_eq!(BackendType::parse("memory"), Some(BackendType::Memory));
        assert_eq!(BackendType::parse("redis"), None);
        assert_eq!(BackendType::Memory.to_string(), "memory");
    }
}
