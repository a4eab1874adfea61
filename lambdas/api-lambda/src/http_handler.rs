use lambda_http::{
    http::{header::HeaderValue, Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;
use taskboard_shared::response::{method_not_allowed, not_found};
use taskboard_shared::{tasks, users, AppState, RawListParams};

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Origin,X-Requested-With,Content-Type,Accept"),
    );
    resp
}

/// One Lambda invocation: route the request, then drain queued reverse
/// reference updates before the execution environment can freeze.
pub(crate) async fn handle_invocation(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let resp = function_handler(event, Arc::clone(&state)).await;
    state.sync.flush().await;
    resp
}

/// Main Lambda handler - routes `/api/tasks` and `/api/users`
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body: &[u8] = event.body().as_ref();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let query = event.query_string_parameters_ref();
    let param = |name: &str| query.and_then(|q| q.first(name));
    let list_params = RawListParams {
        where_: param("where"),
        sort: param("sort"),
        select: param("select"),
        skip: param("skip"),
        limit: param("limit"),
        count: param("count"),
    };

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // --- TASKS ---
        (&Method::GET, ["api", "tasks"]) => tasks::list_tasks(&state, &list_params).await,
        (&Method::POST, ["api", "tasks"]) => tasks::create_task(&state, body).await,
        (&Method::GET, ["api", "tasks", task_id]) => {
            tasks::get_task(&state, task_id, list_params.select).await
        }
        (&Method::PUT, ["api", "tasks", task_id]) => tasks::update_task(&state, task_id, body).await,
        (&Method::DELETE, ["api", "tasks", task_id]) => tasks::delete_task(&state, task_id).await,

        // --- USERS ---
        (&Method::GET, ["api", "users"]) => users::list_users(&state, &list_params).await,
        (&Method::POST, ["api", "users"]) => users::create_user(&state, body).await,
        (&Method::GET, ["api", "users", user_id]) => {
            users::get_user(&state, user_id, list_params.select).await
        }
        (&Method::PUT, ["api", "users", user_id]) => users::update_user(&state, user_id, body).await,
        (&Method::DELETE, ["api", "users", user_id]) => users::delete_user(&state, user_id).await,

        (_, ["api", "tasks" | "users"]) | (_, ["api", "tasks" | "users", _]) => method_not_allowed(),
        _ => {
            tracing::warn!("No route for {} {}", method, path);
            not_found()
        }
    };

    resp.map(with_cors_headers)
}
