use lambda_http::{http::StatusCode, Body, Error, Response};
use taskboard_atoms::tasks::{self, TaskPayload};
use taskboard_atoms::ListOutcome;

use crate::params::{parse_body, parse_list_params, parse_select, RawListParams};
use crate::response::{error_response, json_response};
use crate::AppState;

/// GET /api/tasks
pub async fn list_tasks(state: &AppState, params: &RawListParams<'_>) -> Result<Response<Body>, Error> {
    let request = match parse_list_params(params, Some(state.config.task_default_limit)) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match tasks::list_tasks(&state.tasks, &request).await {
        Ok(ListOutcome::Count(count)) => json_response(StatusCode::OK, "OK", count),
        Ok(ListOutcome::Documents(docs)) => json_response(StatusCode::OK, "OK", docs),
        Err(e) => error_response(&e),
    }
}

/// POST /api/tasks
pub async fn create_task(state: &AppState, body: &[u8]) -> Result<Response<Body>, Error> {
    let payload: TaskPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };

    match tasks::create_task(&state.tasks, &state.sync, payload).await {
        Ok(task) => json_response(StatusCode::CREATED, "Task created successfully.", task),
        Err(e) => error_response(&e),
    }
}

/// GET /api/tasks/{id}
pub async fn get_task(state: &AppState, task_id: &str, select: Option<&str>) -> Result<Response<Body>, Error> {
    let projection = match parse_select(select) {
        Ok(projection) => projection,
        Err(e) => return error_response(&e),
    };

    match tasks::get_task(&state.tasks, task_id, projection.as_ref()).await {
        Ok(doc) => json_response(StatusCode::OK, "OK", doc),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/tasks/{id}
pub async fn update_task(state: &AppState, task_id: &str, body: &[u8]) -> Result<Response<Body>, Error> {
    let payload: TaskPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };

    match tasks::replace_task(&state.tasks, &state.sync, task_id, payload).await {
        Ok(task) => json_response(StatusCode::OK, "Task updated successfully.", task),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(state: &AppState, task_id: &str) -> Result<Response<Body>, Error> {
    match tasks::delete_task(&state.tasks, &state.sync, task_id).await {
        Ok(task) => json_response(StatusCode::OK, "Task deleted successfully.", task),
        Err(e) => error_response(&e),
    }
}
