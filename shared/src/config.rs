use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown STORE_BACKEND `{0}` (expected `dynamodb` or `memory`)")]
    UnknownBackend(String),

    #[error("TASK_DEFAULT_LIMIT must be a non-negative integer, got `{0}`")]
    InvalidLimit(String),
}

/// Runtime settings, read once at cold start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub table_name: String,
    pub store_backend: StoreBackend,
    /// Applied to `GET /tasks` when no `limit` is given. Users have none.
    pub task_default_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            table_name: "taskboard".to_string(),
            store_backend: StoreBackend::DynamoDb,
            task_default_limit: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.store_backend,
        };
        let task_default_limit = match lookup("TASK_DEFAULT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidLimit(raw.clone()))?,
            None => defaults.task_default_limit,
        };

        Ok(Self {
            table_name: lookup("TABLE_NAME").unwrap_or(defaults.table_name),
            store_backend,
            task_default_limit,
        })
    }
}
