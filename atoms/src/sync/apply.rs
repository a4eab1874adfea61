use thiserror::Error;

use crate::store::{EntityStore, StoreError};
use crate::tasks::{Task, UNASSIGNED_NAME};
use crate::users::User;

use super::plan::SyncIntent;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("user {0} no longer exists")]
    MissingUser(String),

    #[error("task {0} no longer exists")]
    MissingTask(String),

    /// The worker stopped with the intent still queued or in flight.
    #[error("sync worker stopped before the update was applied")]
    Abandoned,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether applying an intent wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

/// Executes [`SyncIntent`]s against the two collections.
#[derive(Clone)]
pub struct SyncApplier {
    tasks: EntityStore<Task>,
    users: EntityStore<User>,
}

impl SyncApplier {
    pub fn new(tasks: EntityStore<Task>, users: EntityStore<User>) -> Self {
        Self { tasks, users }
    }

    /// Checks the current state first, so re-applying an intent is a no-op.
    pub async fn apply(&self, intent: &SyncIntent) -> Result<Applied, SyncError> {
        match intent {
            SyncIntent::AddPendingTask { user_id, task_id } => {
                let mut user = self.load_user(user_id).await?;
                if user.has_pending(task_id) {
                    return Ok(Applied::Unchanged);
                }
                user.pending_tasks.push(task_id.clone());
                self.save_user(user_id, user).await?;
                Ok(Applied::Changed)
            }
            SyncIntent::RemovePendingTask { user_id, task_id } => {
                let mut user = self.load_user(user_id).await?;
                if !user.has_pending(task_id) {
                    return Ok(Applied::Unchanged);
                }
                user.pending_tasks.retain(|id| id != task_id);
                self.save_user(user_id, user).await?;
                Ok(Applied::Changed)
            }
            SyncIntent::AssignTask {
                task_id,
                user_id,
                user_name,
            } => {
                let mut task = self.load_task(task_id).await?;
                if task.assigned_user == *user_id && task.assigned_user_name == *user_name {
                    return Ok(Applied::Unchanged);
                }
                task.assigned_user = user_id.clone();
                task.assigned_user_name = user_name.clone();
                self.save_task(task_id, task).await?;
                Ok(Applied::Changed)
            }
            SyncIntent::UnassignTask { task_id } => {
                let mut task = self.load_task(task_id).await?;
                if !task.is_assigned() && task.assigned_user_name == UNASSIGNED_NAME {
                    return Ok(Applied::Unchanged);
                }
                task.assigned_user = String::new();
                task.assigned_user_name = UNASSIGNED_NAME.to_string();
                self.save_task(task_id, task).await?;
                Ok(Applied::Changed)
            }
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<User, SyncError> {
        self.users.get(user_id).await.map_err(|e| missing_user(user_id, e))
    }

    async fn load_task(&self, task_id: &str) -> Result<Task, SyncError> {
        self.tasks.get(task_id).await.map_err(|e| missing_task(task_id, e))
    }

    // the target can disappear between the read and the write
    async fn save_user(&self, user_id: &str, user: User) -> Result<(), SyncError> {
        self.users
            .update(user_id, user)
            .await
            .map(|_| ())
            .map_err(|e| missing_user(user_id, e))
    }

    async fn save_task(&self, task_id: &str, task: Task) -> Result<(), SyncError> {
        self.tasks
            .update(task_id, task)
            .await
            .map(|_| ())
            .map_err(|e| missing_task(task_id, e))
    }
}

fn missing_user(user_id: &str, err: StoreError) -> SyncError {
    match err {
        StoreError::NotFound { .. } => SyncError::MissingUser(user_id.to_string()),
        other => SyncError::Store(other),
    }
}

fn missing_task(task_id: &str, err: StoreError) -> SyncError {
    match err {
        StoreError::NotFound { .. } => SyncError::MissingTask(task_id.to_string()),
        other => SyncError::Store(other),
    }
}
