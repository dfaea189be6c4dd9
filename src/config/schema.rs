//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`TodoConfig`] struct mirroring the file's nodes
//! - Conversion to and from KDL documents
//! - Validation of the values read from disk

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::path::{Path, PathBuf};

use crate::storage::BackendType;
use crate::{Error, Result};

/// Log levels accepted by `log-level` and `TODOKV_LOG`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Settings stored in config.kdl. Every node is optional.
///
/// # KDL Schema
///
/// ```kdl
/// database-path "/home/me/.local/share/todokv/todos.db"
/// backend "sqlite"       // or "memory"
/// busy-timeout-ms 5000
/// log-level "info"
/// ```
///
/// Values are kept as written; [`TodoConfig::validate`] rejects bad ones so
/// a typo surfaces as an error instead of silently falling back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoConfig {
    pub database_path: Option<PathBuf>,
    pub backend: Option<String>,
    pub busy_timeout_ms: Option<i128>,
    pub log_level: Option<String>,
}

impl TodoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the file at `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} in {}", msg, path.display())),
            other => other,
        })
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL: {}", e)))?;
        let config = Self::from_kdl(&doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Pull known nodes out of a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "database-path") {
            let s = value
                .as_string()
                .ok_or_else(|| type_error("database-path", "a string"))?;
            config.database_path = Some(PathBuf::from(s));
        }

        if let Some(value) = first_value(doc, "backend") {
            let s = value
                .as_string()
                .ok_or_else(|| type_error("backend", "a string"))?;
            config.backend = Some(s.to_string());
        }

        if let Some(value) = first_value(doc, "busy-timeout-ms") {
            let ms = value
                .as_integer()
                .ok_or_else(|| type_error("busy-timeout-ms", "an integer"))?;
            config.busy_timeout_ms = Some(ms);
        }

        if let Some(value) = first_value(doc, "log-level") {
            let s = value
                .as_string()
                .ok_or_else(|| type_error("log-level", "a string"))?;
            config.log_level = Some(s.to_string());
        }

        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref path) = self.database_path {
            let mut node = KdlNode::new("database-path");
            node.push(KdlEntry::new(KdlValue::String(
                path.display().to_string(),
            )));
            doc.nodes_mut().push(node);
        }

        if let Some(ref backend) = self.backend {
            let mut node = KdlNode::new("backend");
            node.push(KdlEntry::new(KdlValue::String(backend.clone())));
            doc.nodes_mut().push(node);
        }

        if let Some(ms) = self.busy_timeout_ms {
            let mut node = KdlNode::new("busy-timeout-ms");
            node.push(KdlEntry::new(KdlValue::Integer(ms)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref level) = self.log_level {
            let mut node = KdlNode::new("log-level");
            node.push(KdlEntry::new(KdlValue::String(level.clone())));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref backend) = self.backend {
            if BackendType::parse(backend).is_none() {
                return Err(Error::Config(format!(
                    "backend must be \"sqlite\" or \"memory\", got {:?}",
                    backend
                )));
            }
        }
        if let Some(ms) = self.busy_timeout_ms {
            if !(0..=i128::from(u32::MAX)).contains(&ms) {
                return Err(Error::Config(format!(
                    "busy-timeout-ms must be between 0 and {}, got {}",
                    u32::MAX,
                    ms
                )));
            }
        }
        if let Some(ref level) = self.log_level {
            validate_log_level(level)?;
        }
        if let Some(ref path) = self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("database-path must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Reject anything that is not one of [`LOG_LEVELS`].
pub fn validate_log_level(level: &str) -> Result<()> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "log-level must be one of {}, got {:?}",
            LOG_LEVELS.join(", "),
            level
        )))
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn type_error(node: &str, expected: &str) -> Error {
    Error::Config(format!("{} must be {}", node, expected))
}
