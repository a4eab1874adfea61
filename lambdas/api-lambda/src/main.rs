use lambda_http::{run, service_fn, Error};
use std::sync::Arc;
use taskboard_shared::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

mod http_handler;
use http_handler::handle_invocation;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .json()
        .init();

    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::from_config(config).await);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handle_invocation(event, state).await }
    }))
    .await
}
