//! Storage layer for todo data.
//!
//! This module handles persistence of records and their index entries.
//!
//! ## Store Backends
//!
//! - **SQLite** (default): a single database file, see [`SqliteStore`]
//! - **Memory**: a process-local ordered map, see [`MemoryStore`]
//!
//! Both implement [`KvStore`]: point reads, ordered prefix scans and atomic
//! batches with optimistic checks. Key layout is defined in [`keys`].
//!
//! ## Handle lifecycle
//!
//! Callers acquire a handle per logical operation with [`with_store`], which
//! opens the configured backend, runs the closure and closes the handle on
//! every exit path.

pub mod backend;
pub mod keys;
pub mod memory;
pub mod sqlite;

pub use backend::{
    AtomicBatch, BackendType, Check, CommitOutcome, Entry, KvStore, Mutation, PrefixScan,
    StoreError, StoreResult, Versionstamp,
};
pub use keys::Key;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to open a store handle.
#[derive(Clone)]
pub struct StoreConfig {
    backend: BackendType,
    path: PathBuf,
    busy_timeout: Duration,
    memory: Arc<MemoryStore>,
}

impl StoreConfig {
    /// SQLite database at `path`.
    pub fn sqlite(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            backend: BackendType::Sqlite,
            path: path.into(),
            busy_timeout,
            memory: Arc::new(MemoryStore::new()),
        }
    }

    /// Memory store shared by every handle opened from this config (and its clones).
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            path: PathBuf::new(),
            busy_timeout: Duration::ZERO,
            memory: Arc::new(MemoryStore::new()),
        }
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("path", &self.path)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

/// An open store. Dropping it also releases the underlying resources.
pub enum StoreHandle {
    Sqlite(SqliteStore),
    Memory(Arc<MemoryStore>),
}

impl StoreHandle {
    /// Open a handle for `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        match config.backend {
            BackendType::Sqlite => Ok(Self::Sqlite(SqliteStore::open(
                &config.path,
                config.busy_timeout,
            )?)),
            BackendType::Memory => Ok(Self::Memory(Arc::clone(&config.memory))),
        }
    }

    pub fn store(&self) -> &dyn KvStore {
        match self {
            Self::Sqlite(store) => store,
            Self::Memory(store) => store.as_ref(),
        }
    }

    /// Release the handle.
    pub fn close(self) -> StoreResult<()> {
        match self {
            Self::Sqlite(store) => store.close(),
            Self::Memory(_) => Ok(()),
        }
    }
}

/// Run `f` against a freshly opened store and close it afterwards.
///
/// The handle is released even when `f` fails or panics (via `Drop`); a
/// failure reported by the explicit close is logged, not returned, because
/// the outcome of `f` has already been decided by then.
pub fn with_store<T>(config: &StoreConfig, f: impl FnOnce(&dyn KvStore) -> T) -> StoreResult<T> {
    let handle = StoreHandle::open(config)?;
    let output = f(handle.store());
    if let Err(e) = handle.close() {
        tracing::warn!(error = %e, "failed to close store handle");
    }
    Ok(output)
}
