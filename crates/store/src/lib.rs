//! Task persistence for copydesk.
//!
//! [`TaskStore`] is the only shared mutable resource in the system. Status
//! changes go through [`TaskStore::transition`], a conditional write that
//! only applies when the current status matches the caller's expectation —
//! the enforcement point that keeps concurrent run/approve/reject calls
//! from clobbering each other.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod testing;

pub use error::StoreError;
pub use memory::MemoryTaskStore;
pub use postgres::{PostgresConfig, PostgresTaskStore};
pub use store::{ContentPatch, TaskStore, Transition};
