//! Durable work queue and worker for asynchronous task processing.
//!
//! Submission and generation are decoupled: accepting a brief only enqueues
//! a [`Job`](copydesk_core::Job) pointing at the task, and the
//! [`TaskWorker`] drains jobs at a bounded pace so the generation hub — the
//! true bottleneck — is never overrun.
//!
//! Queue presence is a capability, not a null check: call sites hold a
//! [`JobDispatcher`] that is either Redis-backed or the no-op
//! implementation chosen at startup.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod redis_queue;
pub mod source;
pub mod worker;

pub use config::{QueueConfig, WorkerConfig};
pub use dispatcher::{JobDispatcher, NoopDispatcher};
pub use error::QueueError;
pub use redis_queue::RedisJobQueue;
pub use source::JobSource;
pub use worker::TaskWorker;
