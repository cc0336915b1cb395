use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Advisory generation-tuning signals from the insights service.
///
/// Hints are an optimization, not a requirement: the empty value is always a
/// valid substitute, and gateways fall back to it on any lookup failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid_phrases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_phrases: Vec<String>,
    /// Forward-compatible extension fields the insights service may add.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Hints {
    /// `true` when no hint of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.tone.is_none()
            && self.style.is_none()
            && self.avoid_phrases.is_empty()
            && self.preferred_phrases.is_empty()
            && self.extra.is_empty()
    }
}
