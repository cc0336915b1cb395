use thiserror::Error;

/// Errors produced by token issuance, verification, and the tenant guard.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, expired, or mis-signed token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The verified caller may not act on the requested tenant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Token could not be signed (effectively a configuration problem).
    #[error("token signing failed: {0}")]
    Signing(String),
}
