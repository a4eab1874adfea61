//! HTTP layer for the task board: application state, configuration, and the
//! `/api/tasks` and `/api/users` resource handlers.

pub mod config;
pub mod params;
pub mod response;
pub mod tasks;
pub mod users;

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;
use taskboard_atoms::store::{DocumentStore, DynamoStore, EntityStore, MemoryStore};
use taskboard_atoms::sync::{FailureSink, SyncApplier, SyncQueue, TracingSink};
use taskboard_atoms::tasks::Task;
use taskboard_atoms::users::User;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use params::RawListParams;

/// Everything a handler needs, built once per cold start.
#[derive(Clone)]
pub struct AppState {
    pub tasks: EntityStore<Task>,
    pub users: EntityStore<User>,
    pub sync: SyncQueue,
    pub config: AppConfig,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Self {
        let backend: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::DynamoDb => {
                let aws_config = aws_config::load_from_env().await;
                Arc::new(DynamoStore::new(
                    DynamoClient::new(&aws_config),
                    config.table_name.clone(),
                ))
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Self::with_backend(backend, Arc::new(TracingSink), config)
    }

    /// Must be called inside a Tokio runtime (spawns the sync worker).
    pub fn with_backend(
        backend: Arc<dyn DocumentStore>,
        sink: Arc<dyn FailureSink>,
        config: AppConfig,
    ) -> Self {
        let tasks = EntityStore::new(Arc::clone(&backend));
        let users = EntityStore::new(backend);
        let sync = SyncQueue::spawn(SyncApplier::new(tasks.clone(), users.clone()), sink);

        tracing::info!(
            "App state ready - backend: {:?} table: {}",
            config.store_backend,
            config.table_name
        );

        Self {
            tasks,
            users,
            sync,
            config,
        }
    }

    pub fn in_memory() -> Self {
        let config = AppConfig {
            store_backend: StoreBackend::Memory,
            ..AppConfig::default()
        };
        Self::with_backend(Arc::new(MemoryStore::new()), Arc::new(TracingSink), config)
    }
}
