//! Reverse-reference reconciliation between `Task.assignedUser` and
//! `User.pendingTasks`.
//!
//! Planning is pure ([`plan_task_change`], [`plan_user_change`]); applying runs
//! in the background through [`SyncQueue`] after the primary write has been
//! answered. Nothing here is transactional: concurrent writes to the same
//! task/user pair can interleave and leave the two sides out of step.

pub mod apply;
pub mod plan;
pub mod queue;

pub use apply::{Applied, SyncApplier, SyncError};
pub use plan::{plan_task_change, plan_user_change, SyncIntent};
pub use queue::{apply_batch, FailureSink, SyncQueue, TracingSink};
