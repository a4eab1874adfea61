use lambda_http::{http::StatusCode, Body, Error, Response};
use taskboard_atoms::users::{self, UserPayload};
use taskboard_atoms::ListOutcome;

use crate::params::{parse_body, parse_list_params, parse_select, RawListParams};
use crate::response::{error_response, json_response};
use crate::AppState;

/// GET /api/users
pub async fn list_users(state: &AppState, params: &RawListParams<'_>) -> Result<Response<Body>, Error> {
    // no default limit for users
    let request = match parse_list_params(params, None) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match users::list_users(&state.users, &request).await {
        Ok(ListOutcome::Count(count)) => json_response(StatusCode::OK, "OK", count),
        Ok(ListOutcome::Documents(docs)) => json_response(StatusCode::OK, "OK", docs),
        Err(e) => error_response(&e),
    }
}

/// POST /api/users
pub async fn create_user(state: &AppState, body: &[u8]) -> Result<Response<Body>, Error> {
    let payload: UserPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };

    match users::create_user(&state.users, &state.sync, payload).await {
        Ok(user) => json_response(StatusCode::CREATED, "User created successfully.", user),
        Err(e) => error_response(&e),
    }
}

/// GET /api/users/{id}
pub async fn get_user(state: &AppState, user_id: &str, select: Option<&str>) -> Result<Response<Body>, Error> {
    let projection = match parse_select(select) {
        Ok(projection) => projection,
        Err(e) => return error_response(&e),
    };

    match users::get_user(&state.users, user_id, projection.as_ref()).await {
        Ok(doc) => json_response(StatusCode::OK, "OK", doc),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/users/{id}
pub async fn update_user(state: &AppState, user_id: &str, body: &[u8]) -> Result<Response<Body>, Error> {
    let payload: UserPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };

    match users::replace_user(&state.users, &state.sync, user_id, payload).await {
        Ok(user) => json_response(StatusCode::OK, "User updated successfully.", user),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/users/{id}
pub async fn delete_user(state: &AppState, user_id: &str) -> Result<Response<Body>, Error> {
    match users::delete_user(&state.users, &state.sync, user_id).await {
        Ok(user) => json_response(StatusCode::OK, "User deleted successfully.", user),
        Err(e) => error_response(&e),
    }
}
