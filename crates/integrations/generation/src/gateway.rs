use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use copydesk_auth::TokenAuthority;
use copydesk_client::{RequestOptions, ResilientClient};

use crate::GenerationError;
use crate::prompt::{build_system_prompt, build_user_prompt};
use crate::types::{BrandProfile, GenerateRequest, GeneratedPost};

/// Configuration for the generation hub integration.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of the generation hub.
    pub generation_url: String,
    /// Base URL of the brand-profile service.
    pub profile_url: String,
    /// Upstream provider name passed to the hub.
    pub provider: String,
    /// Model identifier passed to the hub.
    pub model: String,
    /// Per-attempt deadline for the generation call. Generative latency is
    /// far above ordinary service calls.
    pub timeout: Duration,
}

impl GenerationConfig {
    /// Config with platform defaults for everything but the URLs.
    pub fn new(generation_url: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            generation_url: generation_url.into(),
            profile_url: profile_url.into(),
            provider: "anthropic".to_owned(),
            model: "claude-sonnet-4-20250514".to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the provider/model pair.
    #[must_use]
    pub fn with_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.model = model.into();
        self
    }
}

/// Client for the remote generation hub.
pub struct GenerationGateway {
    client: ResilientClient,
    authority: Arc<TokenAuthority>,
    config: GenerationConfig,
}

impl GenerationGateway {
    #[must_use]
    pub fn new(
        client: ResilientClient,
        authority: Arc<TokenAuthority>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            authority,
            config,
        }
    }

    /// Generate a post for the given request.
    ///
    /// Profile lookup is best-effort; the hub call itself propagates
    /// failure since it is the operation the caller asked for.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedPost, GenerationError> {
        let profile = match request.tenant_id.as_deref() {
            Some(tenant) => self.load_brand_profile(tenant).await,
            None => None,
        };

        let system_prompt = build_system_prompt(profile.as_ref());
        let user_prompt = build_user_prompt(&system_prompt, request);

        let url = format!("{}/v1/llm/generate", self.config.generation_url);
        let body = serde_json::json!({
            "provider": self.config.provider,
            "model": self.config.model,
            "input": {
                "messages": [{"role": "user", "content": user_prompt}],
                "system": system_prompt,
                "max_tokens": 800,
                "temperature": 0.7,
            },
        });

        let headers = self.auth_headers()?;
        let opts = RequestOptions::default().with_timeout(self.config.timeout);

        debug!(url = %url, model = %self.config.model, "sending generation request");
        let response = self
            .client
            .post_json(&url, &body, &headers, Some(&opts))
            .await?;

        let output = response
            .get("output")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GenerationError::MalformedResponse(format!("missing output field: {response}"))
            })?;

        Ok(extract_generated(output))
    }

    /// Fetch the tenant's brand profile, degrading to `None` on any failure.
    async fn load_brand_profile(&self, tenant_id: &str) -> Option<BrandProfile> {
        let url = format!("{}/v1/brand/profile/{tenant_id}", self.config.profile_url);
        let headers = match self.auth_headers() {
            Ok(headers) => headers,
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "profile lookup skipped");
                return None;
            }
        };

        match self.client.get::<BrandProfile>(&url, &headers, None).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "failed to load brand profile");
                None
            }
        }
    }

    fn auth_headers(&self) -> Result<HashMap<String, String>, copydesk_auth::AuthError> {
        let token = self.authority.issue_internal("writer")?;
        Ok(HashMap::from([(
            "Authorization".to_owned(),
            format!("Bearer {token}"),
        )]))
    }
}

/// Parse the model's raw output into a [`GeneratedPost`].
///
/// Locates the first top-level `{...}` in the text (string-aware, so braces
/// inside JSON strings don't end the scan) and parses it. Output without a
/// parseable object becomes `{content: raw, hashtags: [], image_prompt: ""}`
/// — a partially structured generation beats a lost one.
pub fn extract_generated(output: &str) -> GeneratedPost {
    if let Some(candidate) = first_json_object(output)
        && let Ok(post) = serde_json::from_str::<GeneratedPost>(candidate)
    {
        return post;
    }

    GeneratedPost {
        content: output.to_owned(),
        hashtags: Vec::new(),
        image_prompt: String::new(),
    }
}

/// Slice out the first balanced top-level `{...}` substring, if any.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
