//! Single-line todo.txt style rendering of a record.

use super::Todo;
use std::fmt;

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#id:{}", self.id)?;

        if self.completed {
            write!(f, " x")?;
        }
        if let Some(priority) = self.priority {
            write!(f, " ({})", priority)?;
        }
        if let (true, Some(completed_at)) = (self.completed, self.completed_at) {
            write!(f, " {}", completed_at.format("%Y-%m-%d"))?;
        }
        write!(f, " {}", self.created_at.format("%Y-%m-%d"))?;
        write!(f, " {}", self.description)?;

        for project in &self.projects {
            write!(f, " +{}", project)?;
        }
        for context in &self.contexts {
            write!(f, " @{}", context)?;
        }
        for (key, value) in &self.tags {
            write!(f, " {}:{}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{NewTodo, Priority};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_minimal() {
        let mut todo = NewTodo::new("Test todo");
        todo.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let todo = todo.into_todo("123".to_string(), Utc::now());
        assert_eq!(todo.to_string(), "#id:123 2024-01-01 Test todo");
    }

    #[test]
    fn test_render_completed_with_all_fields() {
        let mut todo = NewTodo::new("Complete todo")
            .completed(true)
            .with_priority(Priority::new('A').unwrap())
            .with_project("work")
            .with_project("coding")
            .with_context("office")
            .with_context("computer")
            .with_tag("due", "2024-03-01")
            .with_tag("category", "dev");
        todo.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        todo.completed_at = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let todo = todo.into_todo("456".to_string(), Utc::now());

        assert_eq!(
            todo.to_string(),
            "#id:456 x (A) 2024-02-01 2024-01-01 Complete todo +work +coding @office @computer category:dev due:2024-03-01"
        );
    }

    #[test]
    fn test_render_priority_without_completion() {
        let mut todo = NewTodo::new("Priority todo")
            .with_priority(Priority::new('B').unwrap())
            .with_project("personal")
            .with_context("home");
        todo.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let todo = todo.into_todo("789".to_string(), Utc::now());

        assert_eq!(
            todo.to_string(),
            "#id:789 (B) 2024-01-01 Priority todo +personal @home"
        );
    }
}
