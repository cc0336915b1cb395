use serde::{Deserialize, Serialize};

/// Kind of human decision reported back to the insights service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Approved,
    Edited,
    Rejected,
    Published,
}

impl FeedbackType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Edited => "edited",
            Self::Rejected => "rejected",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback on a piece of generated content.
///
/// `content_id` refers to the task whose content is being judged; the
/// optional fields carry enough context for the insights service to learn
/// from edits and rejections without re-reading the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    pub tenant_id: String,
    pub content_id: String,
    pub feedback_type: FeedbackType,
    /// Optional 1-5 rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl FeedbackInput {
    /// Minimal feedback record carrying only the decision.
    #[must_use]
    pub fn decision(
        tenant_id: impl Into<String>,
        content_id: impl Into<String>,
        feedback_type: FeedbackType,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            content_id: content_id.into(),
            feedback_type,
            score: None,
            comment: None,
            original_content: None,
            edited_content: None,
            rejection_reason: None,
        }
    }

    /// Attach the content that was judged.
    #[must_use]
    pub fn with_original_content(mut self, content: impl Into<String>) -> Self {
        self.original_content = Some(content.into());
        self
    }

    /// Attach a rejection reason.
    #[must_use]
    pub fn with_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&FeedbackType::Approved).unwrap(),
            "\"approved\""
        );
        let back: FeedbackType = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, FeedbackType::Rejected);
    }

    #[test]
    fn decision_builder() {
        let input = FeedbackInput::decision("t1", "task-1", FeedbackType::Rejected)
            .with_rejection_reason("off brand");
        assert_eq!(input.feedback_type, FeedbackType::Rejected);
        assert_eq!(input.rejection_reason.as_deref(), Some("off brand"));
        assert!(input.score.is_none());
    }

    #[test]
    fn deserializes_camel_case() {
        let input: FeedbackInput = serde_json::from_str(
            r#"{"tenantId":"t1","contentId":"c1","feedbackType":"edited","editedContent":"new"}"#,
        )
        .unwrap();
        assert_eq!(input.feedback_type, FeedbackType::Edited);
        assert_eq!(input.edited_content.as_deref(), Some("new"));
    }
}
