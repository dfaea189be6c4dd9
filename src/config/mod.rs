//! Configuration for todokv.
//!
//! ## config.kdl
//!
//! Located at `$TODOKV_CONFIG`, or `~/.config/todokv/config.kdl` by default.
//!
//! Contains:
//! - `database-path` - SQLite database file
//! - `backend` - "sqlite" or "memory"
//! - `busy-timeout-ms` - how long SQLite waits on a locked database
//! - `log-level` - tracing level for stderr logging
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_ENV, ConfigOverrides, DB_ENV, LOG_ENV, Resolved, ResolvedConfig, ValueSource,
    resolve_config, resolve_config_with_env,
};
pub use schema::{LOG_LEVELS, TodoConfig};
