pub mod model;
pub mod service;

pub use model::{User, UserPayload};
pub use service::*;
