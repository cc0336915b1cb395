//! Core domain types for the copydesk writer service.
//!
//! Everything here is plain data: the [`Task`] record and its status state
//! machine, the [`Job`] queue envelope, request/feedback inputs, and the
//! [`BestEffort`] outcome type used by advisory integrations. No I/O.

pub mod best_effort;
pub mod error;
pub mod feedback;
pub mod hints;
pub mod job;
pub mod task;
pub mod types;

pub use best_effort::BestEffort;
pub use error::ValidationError;
pub use feedback::{FeedbackInput, FeedbackType};
pub use hints::Hints;
pub use job::{Job, JobId};
pub use task::{BriefInput, Task, TaskStatus};
pub use types::{TaskId, TenantId};
