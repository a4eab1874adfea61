use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;
use serde_json::{json, Value};
use taskboard_atoms::ServiceError;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    message: &'a str,
    data: T,
}

/// `{message, data}` envelope used by every endpoint
pub fn json_response<T: Serialize>(
    status: StatusCode,
    message: &str,
    data: T,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&Envelope { message, data })?.into())
        .map_err(Box::new)?)
}

fn empty_data() -> Value {
    json!({})
}

pub fn error_response(error: &ServiceError) -> Result<Response<Body>, Error> {
    match error {
        ServiceError::MalformedQuery(message) | ServiceError::Validation(message) => {
            json_response(StatusCode::BAD_REQUEST, message, empty_data())
        }
        ServiceError::NotFound(detail) => {
            tracing::debug!("Not found: {}", detail);
            json_response(StatusCode::NOT_FOUND, "Not found", empty_data())
        }
        ServiceError::Store(e) => {
            tracing::error!("Store failure: {}", e);
            json_response(StatusCode::INTERNAL_SERVER_ERROR, "Server error", empty_data())
        }
    }
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json_response(StatusCode::NOT_FOUND, "Not found", empty_data())
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    json_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", empty_data())
}
