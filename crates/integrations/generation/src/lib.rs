//! Content generation through the remote generation hub.
//!
//! [`GenerationGateway`] personalizes a prompt from the tenant's brand
//! profile (best-effort), calls the hub with a generative-latency timeout,
//! and parses the structured reply — falling back to raw text rather than
//! losing a generation that only half-succeeded.

pub mod gateway;
pub mod prompt;
pub mod types;

pub use gateway::{GenerationConfig, GenerationGateway};
pub use types::{BrandProfile, GenerateRequest, GeneratedPost};

use thiserror::Error;

/// Errors from the generation pipeline.
///
/// Generation is the one outbound call whose failure propagates: it is the
/// operation the caller actually asked for.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The hub call failed after retries.
    #[error("generation call failed: {0}")]
    Upstream(#[from] copydesk_client::HttpClientError),

    /// The hub answered but without the expected `output` field.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// A service token could not be signed.
    #[error(transparent)]
    Auth(#[from] copydesk_auth::AuthError),
}
