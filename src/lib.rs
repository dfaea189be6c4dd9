//! todokv - todo records with secondary indexes on a transactional KV store.
//!
//! This library provides the core functionality for the `todokv` CLI and its
//! MCP server: the record model, the key scheme and store engines, and the
//! repository that keeps records and indexes consistent.

pub mod cli;
pub mod commands;
pub mod config;
pub mod mcp;
pub mod models;
pub mod repository;
pub mod storage;


/// Library-level error type for todokv operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error(transparent)]
    Repository(#[from] repository::RepositoryError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for todokv operations.
pub type Result<T> = std::result::Result<T, Error>;
