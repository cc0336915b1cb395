use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use copydesk_auth::TokenAuthority;
use copydesk_client::ResilientClient;
use copydesk_core::{BestEffort, FeedbackInput, Hints};

use crate::InsightsError;
use crate::types::FeedbackAck;

/// Configuration for the insights service integration.
#[derive(Debug, Clone)]
pub struct InsightsConfig {
    /// Base URL of the insights service.
    pub base_url: String,
}

/// Client for the remote insights service.
pub struct InsightsGateway {
    client: ResilientClient,
    authority: Arc<TokenAuthority>,
    config: InsightsConfig,
}

impl InsightsGateway {
    #[must_use]
    pub fn new(
        client: ResilientClient,
        authority: Arc<TokenAuthority>,
        config: InsightsConfig,
    ) -> Self {
        Self {
            client,
            authority,
            config,
        }
    }

    /// Fetch generation hints for a tenant.
    ///
    /// Hints are an optimization, not a requirement: any failure returns
    /// empty hints and logs a warning, never an error.
    pub async fn hints(&self, tenant_id: &str) -> Hints {
        let url = format!(
            "{}/v1/insights/hints/writer?tenantId={tenant_id}",
            self.config.base_url
        );

        let headers = match self.auth_headers() {
            Ok(headers) => headers,
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "hints lookup skipped");
                return Hints::default();
            }
        };

        #[derive(serde::Deserialize)]
        struct HintsResponse {
            #[serde(default)]
            hints: Hints,
        }

        match self.client.get::<HintsResponse>(&url, &headers, None).await {
            Ok(body) => body.hints,
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "failed to get hints from insights");
                Hints::default()
            }
        }
    }

    /// Deliver a feedback record.
    ///
    /// Two sequential calls: the primary feedback write is required and its
    /// failure propagates; the follow-up learning event is advisory and its
    /// outcome is attached to the ack instead of failing the call.
    pub async fn send_feedback(&self, input: &FeedbackInput) -> Result<FeedbackAck, InsightsError> {
        let headers = self.auth_headers()?;

        let feedback_url = format!("{}/v1/metrics/feedback", self.config.base_url);
        let feedback_body = serde_json::json!({
            "generationId": input.content_id,
            "tenantId": input.tenant_id,
            "action": input.feedback_type,
            "contentPreview": input
                .original_content
                .as_deref()
                .map(|c| c.chars().take(200).collect::<String>()),
            "editedContent": input.edited_content,
            "rejectionReason": input.rejection_reason,
            "originalContent": input.original_content,
            "sourceService": "writer",
        });

        let response = self
            .client
            .post_json(&feedback_url, &feedback_body, &headers, None)
            .await?;

        let learning_url = format!("{}/v1/insights/learning-event", self.config.base_url);
        let learning_body = serde_json::json!({
            "tenantId": input.tenant_id,
            "eventType": "feedback_received",
            "service": "writer",
            "data": {
                "contentId": input.content_id,
                "feedbackType": input.feedback_type,
                "score": input.score,
                "hasEdit": input.edited_content.is_some(),
            },
        });

        let learning_event = match self
            .client
            .post_json(&learning_url, &learning_body, &headers, None)
            .await
        {
            Ok(_) => BestEffort::Delivered,
            Err(e) => {
                warn!(error = %e, "failed to send learning event");
                BestEffort::dropped(e)
            }
        };

        Ok(FeedbackAck {
            response,
            learning_event: Some(learning_event),
        })
    }

    fn auth_headers(&self) -> Result<HashMap<String, String>, copydesk_auth::AuthError> {
        let token = self.authority.issue_internal("writer")?;
        Ok(HashMap::from([(
            "Authorization".to_owned(),
            format!("Bearer {token}"),
        )]))
    }
}
