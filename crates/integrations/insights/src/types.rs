use serde::{Deserialize, Serialize};

use copydesk_core::BestEffort;

/// Acknowledgement of a delivered feedback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    /// Raw response body of the primary feedback write.
    pub response: serde_json::Value,
    /// Outcome of the advisory learning-event notification.
    #[serde(skip)]
    pub learning_event: Option<BestEffort>,
}
