use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;

use crate::claims::{AUDIENCE_INTERNAL, Claims};
use crate::error::AuthError;

/// Lifetime of an internal service token.
const INTERNAL_TOKEN_TTL_SECS: i64 = 300;

/// Lifetime of a developer token minted through the dev endpoint.
const DEV_TOKEN_TTL_SECS: i64 = 3600;

/// Authentication configuration shared by issuance and verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HS256 signing secret. Must match every cooperating service.
    pub secret: String,
    /// The platform root identity used as `iss` on internal tokens.
    pub root_issuer: String,
    /// This service's own name, used as `iss` on dev tokens.
    pub service_name: String,
    /// Admin secret gating the dev mint endpoint. `None` disables dev
    /// tokens entirely.
    pub dev_admin_secret: Option<String>,
}

impl AuthConfig {
    /// Config with platform defaults for everything but the secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            root_issuer: "copydesk".to_owned(),
            service_name: "copydesk-writer".to_owned(),
            dev_admin_secret: None,
        }
    }

    /// Override the root issuer identity.
    #[must_use]
    pub fn with_root_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.root_issuer = issuer.into();
        self
    }

    /// Override the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Enable the dev mint endpoint with the given admin secret.
    #[must_use]
    pub fn with_dev_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.dev_admin_secret = Some(secret.into());
        self
    }
}

/// Issues and verifies the platform's service tokens.
///
/// Constructed once at startup and shared by reference; token material is
/// never persisted, and every inbound call verifies freshly.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    config: AuthConfig,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("root_issuer", &self.config.root_issuer)
            .field("service_name", &self.config.service_name)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Build an authority from configuration.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE_INTERNAL]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    /// The configured root issuer identity.
    pub fn root_issuer(&self) -> &str {
        &self.config.root_issuer
    }

    /// Sign a 5-minute internal token for a service-to-service call.
    ///
    /// The issuer is the platform root identity, not this service's name;
    /// receiving services treat such tokens as inherently trusted.
    pub fn issue_internal(&self, subject: &str) -> Result<String, AuthError> {
        self.sign(subject, &self.config.root_issuer, INTERNAL_TOKEN_TTL_SECS)
    }

    /// Sign a 1-hour developer token, gated on the admin secret.
    pub fn issue_dev(&self, name: &str, presented_secret: &str) -> Result<String, AuthError> {
        let Some(expected) = self.config.dev_admin_secret.as_deref() else {
            return Err(AuthError::Unauthorized("dev tokens disabled".into()));
        };
        if expected.is_empty() || presented_secret != expected {
            return Err(AuthError::Unauthorized("bad dev secret".into()));
        }
        self.sign(name, &self.config.service_name, DEV_TOKEN_TTL_SECS)
    }

    /// Verify a bearer token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized("missing token".into()));
        }
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Unauthorized(e.to_string()))
    }

    /// Decide whether a verified caller may act on the requested tenant.
    ///
    /// Internal service identities pass for any tenant. Every other caller
    /// must request exactly the tenant its token subject names; routes that
    /// expect a tenant treat its absence as a caller error.
    pub fn authorize_tenant(
        &self,
        claims: &Claims,
        requested: Option<&str>,
    ) -> Result<(), AuthError> {
        if claims.is_internal(&self.config.root_issuer) {
            return Ok(());
        }
        match requested {
            None => Err(AuthError::Forbidden("tenant required".into())),
            Some(tenant) if tenant == claims.sub => Ok(()),
            Some(tenant) => {
                warn!(
                    subject = %claims.sub,
                    requested = %tenant,
                    "tenant mismatch"
                );
                Err(AuthError::Forbidden(format!(
                    "caller {} may not act on tenant {tenant}",
                    claims.sub
                )))
            }
        }
    }

    fn sign(&self, subject: &str, issuer: &str, ttl_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_owned(),
            aud: AUDIENCE_INTERNAL.to_owned(),
            iss: issuer.to_owned(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new(AuthConfig::new("test-secret-value").with_dev_admin_secret("letmein"))
    }

    #[test]
    fn internal_token_roundtrip() {
        let auth = authority();
        let token = auth.issue_internal("writer").unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "writer");
        assert_eq!(claims.iss, "copydesk");
        assert_eq!(claims.aud, AUDIENCE_INTERNAL);
        assert!(claims.is_internal("copydesk"));
        assert!(claims.exp - claims.iat <= 300);
    }

    #[test]
    fn dev_token_carries_service_issuer() {
        let auth = authority();
        let token = auth.issue_dev("svc:cli", "letmein").unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.iss, "copydesk-writer");
        assert!(!claims.is_internal("copydesk"));
    }

    #[test]
    fn dev_token_rejects_bad_secret() {
        let auth = authority();
        assert!(matches!(
            auth.issue_dev("svc:cli", "wrong"),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn dev_token_disabled_without_config() {
        let auth = TokenAuthority::new(AuthConfig::new("test-secret-value"));
        assert!(matches!(
            auth.issue_dev("svc:cli", "anything"),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn verify_rejects_garbage_and_empty() {
        let auth = authority();
        assert!(matches!(
            auth.verify("not-a-token"),
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(auth.verify(""), Err(AuthError::Unauthorized(_))));
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let other = TokenAuthority::new(AuthConfig::new("a-different-secret"));
        let token = other.issue_internal("writer").unwrap();
        assert!(matches!(
            authority().verify(&token),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn verify_rejects_expired() {
        let auth = authority();
        // Signed 10 minutes in the past, well beyond the default leeway.
        let now = Utc::now();
        let claims = Claims {
            sub: "writer".into(),
            aud: AUDIENCE_INTERNAL.into(),
            iss: "copydesk".into(),
            exp: (now - Duration::seconds(600)).timestamp(),
            iat: (now - Duration::seconds(900)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-value"),
        )
        .unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn internal_caller_acts_on_any_tenant() {
        let auth = authority();
        let token = auth.issue_internal("writer").unwrap();
        let claims = auth.verify(&token).unwrap();
        assert!(auth.authorize_tenant(&claims, Some("any-tenant")).is_ok());
        assert!(auth.authorize_tenant(&claims, None).is_ok());
    }

    #[test]
    fn tenant_caller_must_match_subject() {
        let auth = authority();
        let token = auth.issue_dev("tenant-1", "letmein").unwrap();
        let claims = auth.verify(&token).unwrap();
        assert!(auth.authorize_tenant(&claims, Some("tenant-1")).is_ok());
        assert!(matches!(
            auth.authorize_tenant(&claims, Some("tenant-2")),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            auth.authorize_tenant(&claims, None),
            Err(AuthError::Forbidden(_))
        ));
    }
}
