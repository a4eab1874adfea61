// Re-export model types and service functions
pub mod model;
pub mod service;

pub use model::{Task, TaskPayload, UNASSIGNED_NAME};
pub use service::*;
