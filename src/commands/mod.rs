//! Command implementations for the todokv CLI.
//!
//! Each command acquires a store handle for the duration of one repository
//! call and returns a result that renders as JSON or human-readable text.

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::models::{NewTodo, Priority, Todo, TodoPatch};
use crate::repository;
use crate::storage::{StoreConfig, with_store};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// ==================== Results ====================

#[derive(Debug, Serialize)]
pub struct TodoCreated {
    pub id: String,
}

impl Output for TodoCreated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Created todo {}", self.id)
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TodoShown {
    pub todo: Todo,
}

impl Output for TodoShown {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        self.todo.to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
    pub count: usize,
}

impl Output for TodoList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.todos.is_empty() {
            return "No todos found.".to_string();
        }
        let mut lines: Vec<String> = self.todos.iter().map(Todo::to_string).collect();
        lines.push(format!(
            "{} todo{}",
            self.count,
            if self.count == 1 { "" } else { "s" }
        ));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct TodoUpdated {
    pub todo: Todo,
}

impl Output for TodoUpdated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Updated {}", self.todo)
    }
}

#[derive(Debug, Serialize)]
pub struct TodoDeleted {
    pub id: String,
    pub deleted: bool,
}

impl Output for TodoDeleted {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted todo {}", self.id)
    }
}

#[derive(Debug, Serialize)]
pub struct Setting {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigShown {
    pub config_file: Option<String>,
    pub settings: Vec<Setting>,
}

impl Output for ConfigShown {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "config file: {}",
            self.config_file.as_deref().unwrap_or("(none)")
        )];
        for setting in &self.settings {
            lines.push(format!(
                "{} = {} ({})",
                setting.key, setting.value, setting.source
            ));
        }
        lines.join("\n")
    }
}

// ==================== Commands ====================

/// Which index a listing goes through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Project(String),
    Context(String),
    Priority(Priority),
    Completed(bool),
}

pub fn todo_add(store: &StoreConfig, input: NewTodo) -> Result<TodoCreated> {
    if input.description.trim().is_empty() {
        return Err(Error::InvalidInput(
            "description must not be empty".to_string(),
        ));
    }
    let id = with_store(store, |kv| repository::create_todo(kv, input))??;
    Ok(TodoCreated { id })
}

pub fn todo_show(store: &StoreConfig, id: &str) -> Result<TodoShown> {
    let todo = with_store(store, |kv| repository::get_todo_by_id(kv, id))??;
    Ok(TodoShown { todo })
}

pub fn todo_list(store: &StoreConfig, filter: &ListFilter) -> Result<TodoList> {
    let todos = with_store(store, |kv| match filter {
        ListFilter::All => repository::get_all_todos(kv),
        ListFilter::Project(p) => repository::get_todos_by_project(kv, Some(p)),
        ListFilter::Context(c) => repository::get_todos_by_context(kv, Some(c)),
        ListFilter::Priority(p) => repository::get_todos_by_priority(kv, Some(*p)),
        ListFilter::Completed(done) => repository::get_todos_by_completion(kv, *done),
    })??;
    let count = todos.len();
    Ok(TodoList { todos, count })
}

pub fn todo_update(store: &StoreConfig, id: &str, patch: TodoPatch) -> Result<TodoUpdated> {
    if patch.is_empty() {
        return Err(Error::InvalidInput(
            "nothing to update; pass at least one field".to_string(),
        ));
    }
    if let Some(ref description) = patch.description {
        if description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "description must not be empty".to_string(),
            ));
        }
    }
    let todo = with_store(store, |kv| repository::update_todo(kv, id, patch))??;
    Ok(TodoUpdated { todo })
}

pub fn todo_rm(store: &StoreConfig, id: &str) -> Result<TodoDeleted> {
    let id = with_store(store, |kv| repository::delete_todo(kv, id))??;
    Ok(TodoDeleted { id, deleted: true })
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShown {
    ConfigShown {
        config_file: config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string()),
        settings: vec![
            Setting {
                key: "database-path",
                value: config.database_path().display().to_string(),
                source: config.database_path.source.to_string(),
            },
            Setting {
                key: "backend",
                value: config.backend().to_string(),
                source: config.backend.source.to_string(),
            },
            Setting {
                key: "busy-timeout-ms",
                value: config.busy_timeout().as_millis().to_string(),
                source: config.busy_timeout.source.to_string(),
            },
            Setting {
                key: "log-level",
                value: config.log_level().to_string(),
                source: config.log_level.source.to_string(),
            },
        ],
    }
}
