//! MCP tool definitions, typed inputs and handlers.
//!
//! Every tool deserializes its `arguments` into one input struct before any
//! store work happens, so malformed input never reaches the repository.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::mcp::jsonrpc::text_content;
use crate::models::{NewTodo, Priority, Todo, TodoPatch};
use crate::repository;
use crate::storage::{KvStore, StoreConfig, with_store};

pub const TODO_CREATE: &str = "mcp_todo_create";
pub const TODO_GET_BY_ID: &str = "mcp_todo_get_by_id";
pub const TODO_GET_ALL: &str = "mcp_todo_get_all";
pub const TODO_GET_BY_PROJECT: &str = "mcp_todo_get_by_project";
pub const TODO_GET_BY_CONTEXT: &str = "mcp_todo_get_by_context";
pub const TODO_GET_BY_PRIORITY: &str = "mcp_todo_get_by_priority";
pub const TODO_GET_BY_COMPLETION: &str = "mcp_todo_get_by_completion";
pub const TODO_UPDATE: &str = "mcp_todo_update";
pub const TODO_DELETE: &str = "mcp_todo_delete";

/// Tool definition for the MCP manifest.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDef {
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

fn priority_letters() -> Vec<String> {
    Priority::all().map(|p| p.as_str()).collect()
}

fn label_list_schema(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn tags_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": { "type": "string" },
        "description": "Key-value pairs of tags",
    })
}

/// Get all available MCP tools.
pub fn get_tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: TODO_CREATE,
            description: "Create a new todo item following the todo.txt format",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "description": { "type": "string", "description": "The main description of the todo item" },
                    "priority": { "type": "string", "enum": priority_letters(), "description": "Priority of the todo (A-Z)" },
                    "projects": label_list_schema("List of projects associated with the todo"),
                    "contexts": label_list_schema("List of contexts associated with the todo"),
                    "tags": tags_schema(),
                },
                "required": ["description"],
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_BY_ID,
            description: "Get a todo item by its ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "The ID of the todo item to retrieve" },
                },
                "required": ["id"],
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_ALL,
            description: "Get all todo items",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "random_string": { "type": "string", "description": "Dummy parameter for no-parameter tools" },
                },
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_BY_PROJECT,
            description: "Get todo items filtered by project",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Project to filter todos by (e.g., 'work', 'personal')" },
                },
                "required": ["project"],
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_BY_CONTEXT,
            description: "Get todo items filtered by context",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context": { "type": "string", "description": "Context to filter todos by (e.g., 'home', 'work'). If not provided, returns todos from all contexts." },
                },
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_BY_PRIORITY,
            description: "Get todo items filtered by priority",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "priority": { "type": "string", "enum": priority_letters(), "description": "Priority to filter todos by (A-Z). If not provided, returns todos of all priorities." },
                },
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_GET_BY_COMPLETION,
            description: "Get todo items filtered by completion status",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "completed": { "type": "boolean", "description": "Filter todos by completion status (true for completed, false for incomplete)" },
                },
                "required": ["completed"],
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_UPDATE,
            description: "Update a todo item by its ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "The ID of the todo item to update" },
                    "completed": { "type": "boolean", "description": "Whether the todo is completed" },
                    "priority": { "type": ["string", "null"], "enum": priority_letters().into_iter().map(Value::from).chain([Value::Null]).collect::<Vec<_>>(), "description": "Priority of the todo (A-Z), or null to clear it" },
                    "description": { "type": "string", "description": "The main description of the todo item" },
                    "projects": label_list_schema("List of projects associated with the todo"),
                    "contexts": label_list_schema("List of contexts associated with the todo"),
                    "tags": tags_schema(),
                },
                "required": ["id"],
                "additionalProperties": false,
            }),
        },
        ToolDef {
            name: TODO_DELETE,
            description: "Delete a todo item by its ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "The ID of the todo item to delete" },
                },
                "required": ["id"],
                "additionalProperties": false,
            }),
        },
    ]
}

/// Tool definitions as they appear in `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    get_tools().iter().map(ToolDef::to_value).collect()
}

// ==================== Inputs ====================

/// Extra checks serde cannot express.
trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateInput {
    description: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    contexts: Vec<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl Validate for CreateInput {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("description", &self.description)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdInput {
    id: String,
}

impl Validate for IdInput {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("id", &self.id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetAllInput {
    #[serde(default)]
    #[allow(dead_code)]
    random_string: Option<String>,
}

impl Validate for GetAllInput {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectInput {
    project: String,
}

impl Validate for ProjectInput {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextInput {
    #[serde(default)]
    context: Option<String>,
}

impl Validate for ContextInput {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PriorityInput {
    #[serde(default)]
    priority: Option<Priority>,
}

impl Validate for PriorityInput {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompletionInput {
    completed: bool,
}

impl Validate for CompletionInput {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateInput {
    id: String,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    priority: Option<Option<Priority>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    projects: Option<Vec<String>>,
    #[serde(default)]
    contexts: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
}

impl Validate for UpdateInput {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("id", &self.id)?;
        if let Some(ref description) = self.description {
            require_non_blank("description", description)?;
        }
        Ok(())
    }
}

impl UpdateInput {
    fn into_patch(self) -> (String, TodoPatch) {
        let patch = TodoPatch {
            description: self.description,
            priority: self.priority,
            projects: self.projects,
            contexts: self.contexts,
            tags: self.tags,
            completed: self.completed,
        };
        (self.id, patch)
    }
}

fn parse_input<T: DeserializeOwned + Validate>(args: Value) -> Result<T, String> {
    let args = if args.is_null() { json!({}) } else { args };
    let input: T = serde_json::from_value(args).map_err(|e| e.to_string())?;
    input.validate()?;
    Ok(input)
}

// ==================== Responses ====================

/// Result of a tool call: text blocks plus the error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub content: Vec<String>,
    pub is_error: bool,
}

impl ToolResponse {
    fn ok(content: Vec<String>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            is_error: true,
        }
    }

    /// The `tools/call` result body.
    pub fn to_value(&self) -> Value {
        let content: Vec<Value> = self.content.iter().map(|t| text_content(t)).collect();
        json!({ "content": content, "isError": self.is_error })
    }
}

fn render_lines(todos: &[Todo]) -> String {
    todos
        .iter()
        .map(Todo::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn listing(todos: &[Todo], heading: String, empty: String) -> ToolResponse {
    if todos.is_empty() {
        ToolResponse::ok(vec![empty])
    } else {
        ToolResponse::ok(vec![heading, render_lines(todos)])
    }
}

// ==================== Handlers ====================

fn create(store: &dyn KvStore, input: CreateInput) -> ToolResponse {
    let mut todo = NewTodo::new(input.description);
    todo.priority = input.priority;
    todo.projects = input.projects;
    todo.contexts = input.contexts;
    todo.tags = input.tags;

    match repository::create_todo(store, todo) {
        Ok(id) => ToolResponse::ok(vec![format!("Successfully created todo with ID: {}", id)]),
        Err(e) => ToolResponse::error(format!("Failed to create todo: {}", e)),
    }
}

fn get_by_id(store: &dyn KvStore, input: IdInput) -> ToolResponse {
    match repository::get_todo_by_id(store, &input.id) {
        Ok(todo) => ToolResponse::ok(vec!["Todo found:".to_string(), todo.to_string()]),
        Err(e) => ToolResponse::error(format!("Failed to get todo: {}", e)),
    }
}

fn get_all(store: &dyn KvStore, _input: GetAllInput) -> ToolResponse {
    match repository::get_all_todos(store) {
        Ok(todos) => ToolResponse::ok(vec!["All todos:".to_string(), render_lines(&todos)]),
        Err(e) => ToolResponse::error(format!("Failed to get todos: {}", e)),
    }
}

fn get_by_project(store: &dyn KvStore, input: ProjectInput) -> ToolResponse {
    match repository::get_todos_by_project(store, Some(&input.project)) {
        Ok(todos) => listing(
            &todos,
            format!("Todos for project +{}:", input.project),
            format!("No todos found for project +{}", input.project),
        ),
        Err(e) => ToolResponse::error(format!("Failed to get todos: {}", e)),
    }
}

fn get_by_context(store: &dyn KvStore, input: ContextInput) -> ToolResponse {
    let context = input.context.filter(|c| !c.is_empty());
    match repository::get_todos_by_context(store, context.as_deref()) {
        Ok(todos) => match context {
            Some(c) => listing(
                &todos,
                format!("Todos with context @{}:", c),
                format!("No todos found with context @{}", c),
            ),
            None => listing(
                &todos,
                "All todos by context:".to_string(),
                "No todos found in any context".to_string(),
            ),
        },
        Err(e) => ToolResponse::error(format!("Failed to get todos: {}", e)),
    }
}

fn get_by_priority(store: &dyn KvStore, input: PriorityInput) -> ToolResponse {
    match repository::get_todos_by_priority(store, input.priority) {
        Ok(todos) => match input.priority {
            Some(p) => listing(
                &todos,
                format!("Todos with priority {}:", p),
                format!("No todos found with priority {}", p),
            ),
            None => listing(
                &todos,
                "All todos by priority:".to_string(),
                "No todos found".to_string(),
            ),
        },
        Err(e) => ToolResponse::error(format!("Failed to get todos: {}", e)),
    }
}

fn get_by_completion(store: &dyn KvStore, input: CompletionInput) -> ToolResponse {
    match repository::get_todos_by_completion(store, input.completed) {
        Ok(todos) if input.completed => listing(
            &todos,
            "Completed todos:".to_string(),
            "No completed todos found".to_string(),
        ),
        Ok(todos) => listing(
            &todos,
            "Incomplete todos:".to_string(),
            "No incomplete todos found".to_string(),
        ),
        Err(e) => ToolResponse::error(format!("Failed to get todos: {}", e)),
    }
}

fn update(store: &dyn KvStore, input: UpdateInput) -> ToolResponse {
    let (id, patch) = input.into_patch();
    match repository::update_todo(store, &id, patch) {
        Ok(todo) => ToolResponse::ok(vec![
            "Todo updated successfully:".to_string(),
            todo.to_string(),
        ]),
        Err(e) => ToolResponse::error(format!("Failed to update todo: {}", e)),
    }
}

fn delete(store: &dyn KvStore, input: IdInput) -> ToolResponse {
    match repository::delete_todo(store, &input.id) {
        Ok(id) => ToolResponse::ok(vec![format!("Todo with ID {} deleted successfully", id)]),
        Err(e) => ToolResponse::error(format!("Failed to delete todo: {}", e)),
    }
}

/// Parse the arguments, then run `handler` with a store handle held for
/// this call only.
fn run<T: DeserializeOwned + Validate>(
    store: &StoreConfig,
    args: Value,
    hint: &str,
    handler: fn(&dyn KvStore, T) -> ToolResponse,
) -> ToolResponse {
    let input = match parse_input::<T>(args) {
        Ok(input) => input,
        Err(detail) => {
            return ToolResponse::error(format!("Invalid input: {} ({})", hint, detail));
        }
    };
    match with_store(store, |kv| handler(kv, input)) {
        Ok(response) => response,
        Err(e) => ToolResponse::error(format!("Failed to process request: {}", e)),
    }
}

/// Dispatch a `tools/call` by name.
pub fn call_tool(store: &StoreConfig, name: &str, args: Value) -> ToolResponse {
    tracing::debug!(tool = name, "tool call");
    match name {
        TODO_CREATE => run(store, args, "Please check your input format", create),
        TODO_GET_BY_ID => run(
            store,
            args,
            "Please provide a valid todo ID as a string",
            get_by_id,
        ),
        TODO_GET_ALL => run(store, args, "This tool takes no arguments", get_all),
        TODO_GET_BY_PROJECT => run(
            store,
            args,
            "Please provide a valid project string",
            get_by_project,
        ),
        TODO_GET_BY_CONTEXT => run(
            store,
            args,
            "Please provide a valid context string or omit for all contexts",
            get_by_context,
        ),
        TODO_GET_BY_PRIORITY => run(
            store,
            args,
            "Please provide a valid priority (A-Z) or omit for all priorities",
            get_by_priority,
        ),
        TODO_GET_BY_COMPLETION => run(
            store,
            args,
            "Please provide a valid completion status (boolean)",
            get_by_completion,
        ),
        TODO_UPDATE => run(
            store,
            args,
            "Please provide valid todo update data",
            update,
        ),
        TODO_DELETE => run(store, args, "Please provide a valid todo ID", delete),
        _ => ToolResponse::error(format!("Unknown tool: {}", name)),
    }
}
