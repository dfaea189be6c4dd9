//! Data models for todo records.
//!
//! This module defines the core data structures:
//! - `Todo` - A stored task record with its index-bearing fields
//! - `NewTodo` - A record before the repository mints its id
//! - `TodoPatch` - A partial set of field changes applied by update
//! - `Priority` - Single-letter priority from `A` (highest) to `Z`

mod render;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Priority code, one uppercase letter from `A` to `Z`.
///
/// Ordering follows the alphabet, so `A < B` and `A` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(char);

impl Priority {
    /// Highest priority.
    pub const HIGHEST: Priority = Priority('A');
    /// Lowest priority.
    pub const LOWEST: Priority = Priority('Z');

    /// Create a priority from a letter. Returns `None` outside `A..=Z`.
    pub fn new(letter: char) -> Option<Self> {
        letter.is_ascii_uppercase().then_some(Self(letter))
    }

    /// All priorities in order, `A` first.
    pub fn all() -> impl Iterator<Item = Priority> {
        ('A'..='Z').map(Priority)
    }

    /// The priority letter.
    pub fn letter(&self) -> char {
        self.0
    }

    /// The priority as a one-character string.
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing a priority string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid priority '{0}': expected a single letter A-Z")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Priority::new(c).ok_or_else(|| ParsePriorityError(s.to_string())),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A todo record as stored under its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier minted at creation
    pub id: String,

    /// Task body
    pub description: String,

    /// Completion flag
    #[serde(default)]
    pub completed: bool,

    /// Creation timestamp, never changes
    pub created_at: DateTime<Utc>,

    /// Set exactly when `completed` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Optional priority; absent means "no priority"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Project labels (`+project`)
    #[serde(default)]
    pub projects: Vec<String>,

    /// Context labels (`@context`)
    #[serde(default)]
    pub contexts: Vec<String>,

    /// Free-form `key:value` tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// A todo before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl NewTodo {
    /// Create an open, unprioritized todo created now.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            priority: None,
            projects: Vec::new(),
            contexts: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.projects.push(project.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.push(context.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Attach an id, producing the full record.
    ///
    /// `completed_at` is normalized against `completed`: a completed record
    /// without a completion time gets `now`, an open record loses it.
    pub fn into_todo(self, id: String, now: DateTime<Utc>) -> Todo {
        let completed_at = if self.completed {
            Some(self.completed_at.unwrap_or(now))
        } else {
            None
        };
        Todo {
            id,
            description: self.description,
            completed: self.completed,
            created_at: self.created_at,
            completed_at,
            priority: self.priority,
            projects: self.projects,
            contexts: self.contexts,
            tags: self.tags,
        }
    }
}

/// Partial update of a todo. `None` fields keep their current value.
///
/// `priority` is tri-state: `None` keeps it, `Some(None)` clears it and
/// `Some(Some(p))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub description: Option<String>,
    pub priority: Option<Option<Priority>>,
    pub projects: Option<Vec<String>>,
    pub contexts: Option<Vec<String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn projects(mut self, projects: Vec<String>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this patch over `current`, returning the updated record.
    ///
    /// Completion rules: `completed: true` keeps an existing `completed_at`
    /// or stamps `now`; `completed: false` clears it; omitted leaves both.
    pub fn apply(self, current: &Todo, now: DateTime<Utc>) -> Todo {
        let (completed, completed_at) = match self.completed {
            Some(true) => (true, Some(current.completed_at.unwrap_or(now))),
            Some(false) => (false, None),
            None => (current.completed, current.completed_at),
        };

        Todo {
            id: current.id.clone(),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            completed,
            created_at: current.created_at,
            completed_at,
            priority: self.priority.unwrap_or(current.priority),
            projects: self.projects.unwrap_or_else(|| current.projects.clone()),
            contexts: self.contexts.unwrap_or_else(|| current.contexts.clone()),
            tags: self.tags.unwrap_or_else(|| current.tags.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn sample() -> Todo {
        NewTodo::new("write docs")
            .with_priority(Priority::new('C').unwrap())
            .with_project("docs")
            .into_todo("t-1".to_string(), at(1))
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("A".parse::<Priority>().unwrap(), Priority::HIGHEST);
        assert!("a".parse::<Priority>().is_err());
        assert!("AB".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
        assert!(Priority::new('1').is_none());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::HIGHEST < Priority::LOWEST);
        assert_eq!(Priority::all().count(), 26);
        assert_eq!(Priority::all().next(), Some(Priority::HIGHEST));
    }

    #[test]
    fn test_priority_serializes_as_letter() {
        let json = serde_json::to_string(&Priority::new('B').unwrap()).unwrap();
        assert_eq!(json, "\"B\"");
        let back: Priority = serde_json::from_str("\"Q\"").unwrap();
        assert_eq!(back.letter(), 'Q');
        assert!(serde_json::from_str::<Priority>("\"q\"").is_err());
    }

    #[test]
    fn test_todo_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("completedAt").is_none());
        assert_eq!(json["priority"], "C");
    }

    #[test]
    fn test_into_todo_normalizes_completed_at() {
        let mut open = NewTodo::new("x");
        open.completed_at = Some(at(3));
        assert_eq!(open.into_todo("a".into(), at(5)).completed_at, None);

        let done = NewTodo::new("y").completed(true).into_todo("b".into(), at(5));
        assert_eq!(done.completed_at, Some(at(5)));
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let current = sample();
        let updated = TodoPatch::new().description("rewrite docs").apply(&current, at(2));
        assert_eq!(updated.description, "rewrite docs");
        assert_eq!(updated.priority, current.priority);
        assert_eq!(updated.projects, current.projects);
        assert_eq!(updated.created_at, current.created_at);
    }

    #[test]
    fn test_patch_completion_transitions() {
        let current = sample();

        let done = TodoPatch::new().completed(true).apply(&current, at(2));
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(at(2)));

        // Completing again keeps the original completion time
        let again = TodoPatch::new().completed(true).apply(&done, at(9));
        assert_eq!(again.completed_at, Some(at(2)));

        let reopened = TodoPatch::new().completed(false).apply(&done, at(3));
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_at, None);

        let untouched = TodoPatch::new().description("z").apply(&done, at(4));
        assert_eq!(untouched.completed_at, Some(at(2)));
    }

    #[test]
    fn test_patch_clears_priority() {
        let cleared = TodoPatch::new().priority(None).apply(&sample(), at(2));
        assert_eq!(cleared.priority, None);
        assert!(TodoPatch::new().is_empty());
    }
}
