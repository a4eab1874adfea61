use super::model::{Task, TaskPayload};
use crate::error::ServiceError;
use crate::listing::{run_list, ListOutcome, ListRequest};
use crate::store::{Document, EntityStore, Projection};
use crate::sync::{plan_task_change, SyncQueue};

/// List tasks (or count them) for a parsed list request
pub async fn list_tasks(
    tasks: &EntityStore<Task>,
    request: &ListRequest,
) -> Result<ListOutcome, ServiceError> {
    run_list(tasks, request).await
}

/// Create a task and queue the assignee's `pendingTasks` update
pub async fn create_task(
    tasks: &EntityStore<Task>,
    sync: &SyncQueue,
    payload: TaskPayload,
) -> Result<Task, ServiceError> {
    payload.require_fields()?;

    let task = tasks.create(payload.into_task()).await?;
    tracing::info!("Created task {}", task.id);

    sync.submit(plan_task_change(None, Some(&task)));
    Ok(task)
}

/// Get a specific task, optionally projected
pub async fn get_task(
    tasks: &EntityStore<Task>,
    task_id: &str,
    projection: Option<&Projection>,
) -> Result<Document, ServiceError> {
    Ok(tasks.find_by_id(task_id, projection).await?)
}

/// Replace every mutable field of a task
pub async fn replace_task(
    tasks: &EntityStore<Task>,
    sync: &SyncQueue,
    task_id: &str,
    payload: TaskPayload,
) -> Result<Task, ServiceError> {
    payload.require_fields()?;

    let old_task = tasks.get(task_id).await?;

    let mut task = payload.into_task();
    task.id = old_task.id.clone();
    task.date_created = old_task.date_created.clone();

    let updated = tasks.update(task_id, task).await?;
    tracing::info!("Updated task {}", updated.id);

    sync.submit(plan_task_change(Some(&old_task), Some(&updated)));
    Ok(updated)
}

/// Delete a task and queue its removal from the assignee
pub async fn delete_task(
    tasks: &EntityStore<Task>,
    sync: &SyncQueue,
    task_id: &str,
) -> Result<Task, ServiceError> {
    let removed = tasks.delete(task_id).await?;
    tracing::info!("Deleted task {}", removed.id);

    sync.submit(plan_task_change(Some(&removed), None));
    Ok(removed)
}
