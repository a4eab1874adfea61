//! Domain atoms for the task board: entities, storage, and reverse-reference
//! reconciliation between tasks and users.

pub mod error;
pub mod listing;
pub mod store;
pub mod sync;
pub mod tasks;
pub mod users;

pub use error::ServiceError;
pub use listing::{ListOutcome, ListRequest};
