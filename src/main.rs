//! todokv CLI - todo records with atomic secondary indexes.

use std::collections::BTreeMap;
use std::process;

use clap::Parser;
use todokv::cli::{Cli, Commands, ConfigCommands, McpCommands};
use todokv::commands::{self, ListFilter, Output};
use todokv::config::{ConfigOverrides, ResolvedConfig, resolve_config};
use todokv::mcp;
use todokv::models::{NewTodo, TodoPatch};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    let overrides = ConfigOverrides {
        database_path: cli.db.clone(),
        backend: cli.backend,
        log_level: cli.log_level.clone(),
    };

    let result = resolve_config(&overrides).and_then(|config| {
        init_logging(config.log_level());
        run_command(cli.command, &config, human)
    });

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Send tracing output to stderr so stdout stays clean for JSON and MCP frames.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn run_command(
    command: Commands,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), todokv::Error> {
    let store = config.to_store_config();

    match command {
        Commands::Add {
            description,
            priority,
            projects,
            contexts,
            tags,
        } => {
            let mut input = NewTodo::new(description);
            input.priority = priority;
            input.projects = projects;
            input.contexts = contexts;
            input.tags = tags.into_iter().collect();
            let result = commands::todo_add(&store, input)?;
            output(&result, human);
        }

        Commands::Show { id } => {
            let result = commands::todo_show(&store, &id)?;
            output(&result, human);
        }

        Commands::List {
            project,
            context,
            priority,
            completed,
        } => {
            let filter = match (project, context, priority, completed) {
                (Some(p), _, _, _) => ListFilter::Project(p),
                (_, Some(c), _, _) => ListFilter::Context(c),
                (_, _, Some(p), _) => ListFilter::Priority(p),
                (_, _, _, Some(done)) => ListFilter::Completed(done),
                _ => ListFilter::All,
            };
            let result = commands::todo_list(&store, &filter)?;
            output(&result, human);
        }

        Commands::Update {
            id,
            description,
            priority,
            clear_priority,
            projects,
            contexts,
            tags,
            completed,
        } => {
            let patch = TodoPatch {
                description,
                priority: if clear_priority {
                    Some(None)
                } else {
                    priority.map(Some)
                },
                projects,
                contexts,
                tags: tags.map(|t| t.into_iter().collect::<BTreeMap<_, _>>()),
                completed,
            };
            let result = commands::todo_update(&store, &id, patch)?;
            output(&result, human);
        }

        Commands::Rm { id } => {
            let result = commands::todo_rm(&store, &id)?;
            output(&result, human);
        }

        Commands::Mcp { command } => match command {
            McpCommands::Serve => mcp::serve(store)?,
            McpCommands::Manifest => {
                println!("{}", serde_json::to_string_pretty(&mcp::manifest())?);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(config), human),
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
