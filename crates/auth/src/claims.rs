use serde::{Deserialize, Serialize};

/// Audience value carried by every service token.
pub const AUDIENCE_INTERNAL: &str = "internal";

/// Decoded service-token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity. For user-scoped tokens this is the tenant id; for
    /// service tokens a service name such as `writer`.
    pub sub: String,
    /// Always [`AUDIENCE_INTERNAL`] for tokens this platform issues.
    pub aud: String,
    /// The platform root identity for internal tokens, or the issuing
    /// service's own name for dev tokens.
    pub iss: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
}

impl Claims {
    /// `true` when the token proves a platform-internal service identity.
    ///
    /// Internal callers are inherently trusted and may act on behalf of any
    /// tenant.
    pub fn is_internal(&self, root_issuer: &str) -> bool {
        self.iss == root_issuer && self.aud == AUDIENCE_INTERNAL
    }
}
