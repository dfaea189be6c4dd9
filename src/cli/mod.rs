//! CLI argument definitions for todokv.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Priority;
use crate::storage::BackendType;

/// Version string with the commit and build time injected by build.rs.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TODOKV_GIT_COMMIT"),
    " ",
    env!("TODOKV_BUILD_TIMESTAMP"),
    ")"
);

/// todokv - todo.txt style todos in a transactional key-value store.
#[derive(Parser, Debug)]
#[command(name = "todokv")]
#[command(author, version = VERSION, about = "Todo records with atomic secondary indexes", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Database file (overrides TODOKV_DB and config.kdl)
    #[arg(long = "db", global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Storage backend
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<BackendType>,

    /// Log level for stderr logging (trace, debug, info, warn, error)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a todo
    Add {
        /// Todo description
        description: String,

        /// Priority letter (A-Z)
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,

        /// Project label (repeatable)
        #[arg(long = "project", value_name = "PROJECT")]
        projects: Vec<String>,

        /// Context label (repeatable)
        #[arg(long = "context", value_name = "CONTEXT")]
        contexts: Vec<String>,

        /// Tag as key:value (repeatable)
        #[arg(long = "tag", value_name = "KEY:VALUE", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },

    /// Show one todo by ID
    Show {
        /// Todo ID
        id: String,
    },

    /// List todos, optionally through one index
    List {
        /// Only todos carrying this project
        #[arg(long, conflicts_with_all = ["context", "priority", "completed"])]
        project: Option<String>,

        /// Only todos carrying this context
        #[arg(long, conflicts_with_all = ["priority", "completed"])]
        context: Option<String>,

        /// Only todos with this priority
        #[arg(long, value_parser = parse_priority, conflicts_with = "completed")]
        priority: Option<Priority>,

        /// Only completed (true) or open (false) todos
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Update fields of a todo
    Update {
        /// Todo ID
        id: String,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New priority letter (A-Z)
        #[arg(short, long, value_parser = parse_priority, conflicts_with = "clear_priority")]
        priority: Option<Priority>,

        /// Remove the priority
        #[arg(long)]
        clear_priority: bool,

        /// Replace projects (repeatable)
        #[arg(long = "project", value_name = "PROJECT")]
        projects: Option<Vec<String>>,

        /// Replace contexts (repeatable)
        #[arg(long = "context", value_name = "CONTEXT")]
        contexts: Option<Vec<String>>,

        /// Replace tags, each key:value (repeatable)
        #[arg(long = "tag", value_name = "KEY:VALUE", value_parser = parse_tag)]
        tags: Option<Vec<(String, String)>>,

        /// Set completion status
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete a todo
    Rm {
        /// Todo ID
        id: String,
    },

    /// MCP server commands
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// MCP subcommands
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start stdio MCP server
    Serve,

    /// Output tool definitions
    Manifest,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each came from
    Show,
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_backend(s: &str) -> Result<BackendType, String> {
    BackendType::parse(s).ok_or_else(|| format!("unknown backend '{}' (sqlite, memory)", s))
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("tag must be key:value, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_labels() {
        let cli = Cli::try_parse_from([
            "todokv", "add", "buy milk", "-p", "A", "--project", "home", "--project", "errands",
            "--tag", "due:2024-05-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Add {
                description,
                priority,
                projects,
                tags,
                ..
            } => {
                assert_eq!(description, "buy milk");
                assert_eq!(priority, Priority::new('A'));
                assert_eq!(projects, vec!["home", "errands"]);
                assert_eq!(tags, vec![("due".to_string(), "2024-05-01".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["todokv", "list", "-H", "--backend", "memory"]).unwrap();
        assert!(cli.human_readable);
        assert_eq!(cli.backend, Some(BackendType::Memory));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["todokv", "add", "x", "-p", "AB"]).is_err());
        assert!(Cli::try_parse_from(["todokv", "add", "x", "--tag", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["todokv", "list", "--backend", "redis"]).is_err());
        assert!(
            Cli::try_parse_from(["todokv", "list", "--project", "a", "--context", "b"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["todokv", "update", "x", "-p", "A", "--clear-priority"]).is_err()
        );
    }
}
