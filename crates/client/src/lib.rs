//! Resilient outbound HTTP client.
//!
//! Every call copydesk makes to a cooperating service goes through
//! [`ResilientClient`]: bounded retries with linear backoff, a hard
//! per-attempt deadline enforced independently of the transport, and an
//! idempotency key resent verbatim on every retry of the same logical POST.

pub mod client;
pub mod error;
pub mod options;

pub use client::ResilientClient;
pub use error::HttpClientError;
pub use options::RequestOptions;
