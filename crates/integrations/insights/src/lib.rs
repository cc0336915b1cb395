//! Feedback and hints integration with the insights service.
//!
//! Hints are advisory and degrade to empty on any failure. Feedback is
//! split: the primary record is the source of truth and its failure
//! propagates; the follow-up learning event is advisory telemetry reported
//! as a typed best-effort outcome.

pub mod gateway;
pub mod types;

pub use gateway::{InsightsConfig, InsightsGateway};
pub use types::FeedbackAck;

use thiserror::Error;

/// Errors from the required half of the insights integration.
#[derive(Debug, Error)]
pub enum InsightsError {
    /// The primary feedback write failed after retries.
    #[error("feedback delivery failed: {0}")]
    Feedback(#[from] copydesk_client::HttpClientError),

    /// A service token could not be signed.
    #[error(transparent)]
    Auth(#[from] copydesk_auth::AuthError),
}
