use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{TaskId, TenantId};

/// Minimum length of a brief, in characters.
pub const MIN_BRIEF_LEN: usize = 5;

/// Position of a task in its lifecycle.
///
/// ```text
/// queued -> pending_approval -> approved
///                            -> rejected
/// pending_approval -> queued        (rejection with regeneration)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created and waiting for a generation run.
    Queued,
    /// Content generated; waiting for a human decision.
    PendingApproval,
    /// Accepted. Terminal.
    Approved,
    /// Declined without regeneration. Terminal.
    Rejected,
}

impl TaskStatus {
    /// Wire name of the status (`queued`, `pending_approval`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a wire name back into a status.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// `true` once no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted unit of work tracking a brief through generation and approval.
///
/// Tasks are never deleted; terminal tasks are retained for audit and
/// feedback. `content` is absent exactly while the task is `Queued`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// Owning tenant. Never changes after creation.
    #[serde(rename = "tenantId")]
    pub tenant: TenantId,

    /// The user-supplied instruction describing the desired content.
    pub brief: String,

    /// Optional tone request (e.g. `"playful"`).
    pub tone: Option<String>,

    /// Optional audience override.
    pub audience: Option<String>,

    /// Optional target platform (adjusts length and style).
    pub platform: Option<String>,

    /// Current lifecycle position.
    pub status: TaskStatus,

    /// Generated copy, present once the task has passed a generation run.
    pub content: Option<String>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a fresh task in `Queued` with no content.
    #[must_use]
    pub fn new(input: BriefInput) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            tenant: TenantId::new(input.tenant_id),
            brief: input.brief,
            tone: input.tone,
            audience: input.audience,
            platform: input.platform,
            status: TaskStatus::Queued,
            content: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload of a brief submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefInput {
    /// Tenant the task belongs to. Must be non-empty.
    pub tenant_id: String,
    /// The brief text. Must be at least [`MIN_BRIEF_LEN`] characters.
    pub brief: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl BriefInput {
    /// Validate the submission payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tenant_id.trim().is_empty() {
            return Err(ValidationError::new("tenantId", "must be non-empty"));
        }
        if self.brief.chars().count() < MIN_BRIEF_LEN {
            return Err(ValidationError::new(
                "brief",
                format!("must be at least {MIN_BRIEF_LEN} characters"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(tenant: &str, text: &str) -> BriefInput {
        BriefInput {
            tenant_id: tenant.into(),
            brief: text.into(),
            tone: None,
            audience: None,
            platform: None,
        }
    }

    #[test]
    fn new_task_is_queued_without_content() {
        let task = Task::new(brief("t1", "Launch our new espresso blend"));
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.content.is_none());
        assert_eq!(task.tenant.as_str(), "t1");
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn validate_rejects_empty_tenant() {
        let err = brief("", "long enough brief").validate().unwrap_err();
        assert_eq!(err.field, "tenantId");
    }

    #[test]
    fn validate_rejects_short_brief() {
        let err = brief("t1", "tiny").validate().unwrap_err();
        assert_eq!(err.field, "brief");
    }

    #[test]
    fn validate_accepts_minimal_valid_input() {
        assert!(brief("t1", "hello").validate().is_ok());
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::PendingApproval,
            TaskStatus::Approved,
            TaskStatus::Rejected,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Approved.is_terminal());
        assert!(TaskStatus::Rejected.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::PendingApproval.is_terminal());
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task::new(brief("t1", "Launch our new espresso blend"));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["tenantId"], "t1");
        assert_eq!(json["status"], "queued");
        assert!(json["createdAt"].is_string());
    }
}
