use crate::tasks::Task;
use crate::users::User;

/// One reverse-side update. Each targets a single entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncIntent {
    /// Append `task_id` to the user's `pendingTasks` unless already present
    AddPendingTask { user_id: String, task_id: String },
    /// Drop `task_id` from the user's `pendingTasks` if present
    RemovePendingTask { user_id: String, task_id: String },
    /// Point the task at `user_id`, copying the user's current name
    AssignTask {
        task_id: String,
        user_id: String,
        user_name: String,
    },
    /// Reset the task to `""` / `"unassigned"`
    UnassignTask { task_id: String },
}

/// Intents for a task create (`old = None`), update, or delete (`new = None`).
pub fn plan_task_change(old: Option<&Task>, new: Option<&Task>) -> Vec<SyncIntent> {
    let Some(task_id) = new.or(old).map(|t| t.id.as_str()) else {
        return Vec::new();
    };
    let old_assigned = old.map_or("", |t| t.assigned_user.as_str());
    let new_assigned = new.map_or("", |t| t.assigned_user.as_str());

    let mut intents = Vec::new();
    if old_assigned == new_assigned {
        return intents;
    }
    if !old_assigned.is_empty() {
        intents.push(SyncIntent::RemovePendingTask {
            user_id: old_assigned.to_string(),
            task_id: task_id.to_string(),
        });
    }
    if !new_assigned.is_empty() {
        intents.push(SyncIntent::AddPendingTask {
            user_id: new_assigned.to_string(),
            task_id: task_id.to_string(),
        });
    }
    intents
}

/// Intents for a user update or delete (`new = None`).
///
/// Creation (`old = None`) plans nothing: an initial `pendingTasks` list is
/// stored as given and never pulled onto the tasks it names.
pub fn plan_user_change(old: Option<&User>, new: Option<&User>) -> Vec<SyncIntent> {
    let Some(old) = old else {
        return Vec::new();
    };
    let new_pending: &[String] = new.map_or(&[], |u| u.pending_tasks.as_slice());

    let mut intents: Vec<SyncIntent> = old
        .pending_tasks
        .iter()
        .filter(|id| !new_pending.contains(*id))
        .map(|id| SyncIntent::UnassignTask {
            task_id: id.clone(),
        })
        .collect();

    if let Some(user) = new {
        intents.extend(
            new_pending
                .iter()
                .filter(|id| !old.pending_tasks.contains(*id))
                .map(|id| SyncIntent::AssignTask {
                    task_id: id.clone(),
                    user_id: user.id.clone(),
                    user_name: user.name.clone(),
                }),
        );
    }
    intents
}
