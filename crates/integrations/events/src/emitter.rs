use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use copydesk_auth::TokenAuthority;
use copydesk_client::ResilientClient;
use copydesk_core::BestEffort;

use crate::event::Event;

/// Configuration for the events service integration.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Base URL of the events service.
    pub base_url: String,
}

/// Client for the remote events service.
///
/// Both operations are fire-and-forget: failures are logged and folded into
/// a [`BestEffort`] outcome, never an error. Losing a generated result over
/// a telemetry hiccup is not acceptable, so callers are free to discard the
/// outcome entirely.
pub struct EventEmitter {
    client: ResilientClient,
    authority: Arc<TokenAuthority>,
    config: EventsConfig,
}

impl EventEmitter {
    #[must_use]
    pub fn new(
        client: ResilientClient,
        authority: Arc<TokenAuthority>,
        config: EventsConfig,
    ) -> Self {
        Self {
            client,
            authority,
            config,
        }
    }

    /// Record a lifecycle event.
    pub async fn log_event(&self, event: &Event) -> BestEffort {
        let url = format!("{}/v1/events/log", self.config.base_url);
        self.post_advisory(&url, &serde_json::json!(event), "events log")
            .await
    }

    /// Apply a reward signal.
    pub async fn apply_reward(&self, payload: &serde_json::Value) -> BestEffort {
        let url = format!("{}/v1/rewards/apply", self.config.base_url);
        self.post_advisory(&url, payload, "reward apply").await
    }

    async fn post_advisory(
        &self,
        url: &str,
        body: &serde_json::Value,
        what: &str,
    ) -> BestEffort {
        let token = match self.authority.issue_internal("writer") {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "{what} skipped: could not sign service token");
                return BestEffort::dropped(e);
            }
        };
        let headers = HashMap::from([("Authorization".to_owned(), format!("Bearer {token}"))]);

        match self.client.post_json(url, body, &headers, None).await {
            Ok(_) => BestEffort::Delivered,
            Err(e) => {
                warn!(url, error = %e, "{what} failed");
                BestEffort::dropped(e)
            }
        }
    }
}
