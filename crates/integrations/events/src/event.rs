use serde::{Deserialize, Serialize};

/// A lifecycle event recorded against the audit stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub tenant_id: String,
    /// Workflow correlation id; writer-originated events carry none.
    pub workflow_id: Option<String>,
    /// Dotted event name, e.g. `agent.writer.run.start`.
    pub event_type: String,
    /// Originating service, always `writer` for this process.
    pub source: String,
    /// Counter weight of the event; `1` for plain occurrences.
    pub value: i64,
    /// Free-form metadata; enough to audit without re-reading the task.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl Event {
    /// Build a writer-sourced event with weight 1.
    #[must_use]
    pub fn writer(
        tenant_id: impl Into<String>,
        event_type: impl Into<String>,
        meta: serde_json::Value,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            workflow_id: None,
            event_type: event_type.into(),
            source: "writer".to_owned(),
            value: 1,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_event_shape() {
        let event = Event::writer("t1", "agent.writer.run.start", serde_json::json!({"taskId": "a"}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "writer");
        assert_eq!(json["eventType"], "agent.writer.run.start");
        assert_eq!(json["value"], 1);
        assert_eq!(json["meta"]["taskId"], "a");
        assert!(json["workflowId"].is_null());
    }
}
