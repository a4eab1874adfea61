use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::store::Entity;

/// Display name stored on a task that has no assignee.
pub const UNASSIGNED_NAME: &str = "unassigned";

/// Task domain model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,

    /// Kept exactly as the client sent it
    pub deadline: Value,

    #[serde(default)]
    pub completed: bool,

    // FE expects plain strings (empty string = no assignee)
    #[serde(default)]
    pub assigned_user: String,

    /// Copy of the assignee's name as of the last reconciliation
    #[serde(default = "unassigned_name")]
    pub assigned_user_name: String,

    #[serde(default)]
    pub date_created: Option<String>,
}

fn unassigned_name() -> String {
    UNASSIGNED_NAME.to_string()
}

impl Task {
    pub fn is_assigned(&self) -> bool {
        !self.assigned_user.is_empty()
    }
}

impl Entity for Task {
    const COLLECTION: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("task name is required".to_string());
        }
        if self.deadline.is_null() {
            return Err("task deadline is required".to_string());
        }
        Ok(())
    }
}

/// Body of `POST /tasks` and `PUT /tasks/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Value>,
    pub completed: Option<bool>,
    pub assigned_user: Option<String>,
    pub assigned_user_name: Option<String>,
}

impl TaskPayload {
    pub fn require_fields(&self) -> Result<(), ServiceError> {
        let has_name = self.name.as_deref().is_some_and(|n| !n.is_empty());
        let has_deadline = self.deadline.as_ref().is_some_and(is_truthy);
        if has_name && has_deadline {
            Ok(())
        } else {
            Err(ServiceError::Validation(
                "Name and deadline are required.".to_string(),
            ))
        }
    }

    /// Builds a fresh task; absent optional fields take their defaults.
    pub fn into_task(self) -> Task {
        Task {
            id: String::new(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            deadline: self.deadline.unwrap_or(Value::Null),
            completed: self.completed.unwrap_or(false),
            assigned_user: self.assigned_user.unwrap_or_default(),
            assigned_user_name: self
                .assigned_user_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(unassigned_name),
            date_created: None,
        }
    }
}

/// `false`, `0`, `""` and `null` count as missing.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
