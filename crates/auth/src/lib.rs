//! Service-to-service authentication for copydesk.
//!
//! Every cooperating service signs short-lived HS256 tokens with a shared
//! secret. [`TokenAuthority`] issues and verifies them; the tenant guard
//! decides whether a verified caller may act on a given tenant.
//!
//! The signing secret and the root issuer string are process-wide
//! configuration that must match across every cooperating service. A
//! mismatch shows up as 401s at call time, not as a startup error — deploys
//! should monitor for auth failure spikes after secret rotation.

pub mod authority;
pub mod claims;
pub mod error;

pub use authority::{AuthConfig, TokenAuthority};
pub use claims::{AUDIENCE_INTERNAL, Claims};
pub use error::AuthError;
