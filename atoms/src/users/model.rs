use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ServiceError;
use crate::store::Entity;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    pub email: String,

    /// Ids of tasks assigned to this user, first occurrence wins
    #[serde(default)]
    pub pending_tasks: Vec<String>,

    #[serde(default)]
    pub date_created: Option<String>,
}

impl User {
    pub fn has_pending(&self, task_id: &str) -> bool {
        self.pending_tasks.iter().any(|id| id == task_id)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("user name is required".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("user email is required".to_string());
        }
        Ok(())
    }
}

/// Body of `POST /users` and `PUT /users/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pending_tasks: Option<Vec<String>>,
}

impl UserPayload {
    pub fn require_fields(&self) -> Result<(), ServiceError> {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        if present(&self.name) && present(&self.email) {
            Ok(())
        } else {
            Err(ServiceError::Validation(
                "Name and email are required.".to_string(),
            ))
        }
    }

    pub fn into_user(self) -> User {
        User {
            id: String::new(),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            pending_tasks: dedup_preserving_order(self.pending_tasks.unwrap_or_default()),
            date_created: None,
        }
    }
}

pub fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
