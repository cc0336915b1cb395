//! Fire-and-forget audit event logging.
//!
//! Lifecycle events go to a remote events service so an audit trail can be
//! reconstructed without re-reading the task store. Delivery is strictly
//! advisory: the emitter reports a [`BestEffort`](copydesk_core::BestEffort)
//! outcome and never fails its caller.

pub mod emitter;
pub mod event;

pub use emitter::{EventEmitter, EventsConfig};
pub use event::Event;
