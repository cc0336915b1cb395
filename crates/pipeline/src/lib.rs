//! Task lifecycle orchestration.
//!
//! [`TaskPipeline`] is the single entry point for every lifecycle
//! transition: submit creates and enqueues, run drives generation into the
//! approval gate, approve/reject record the human decision. Generated
//! output is never auto-published — a task must pass through
//! `pending_approval` before any terminal accepted state.

pub mod error;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::{RejectOutcome, RunOutcome, SubmitOutcome, TaskPipeline};
