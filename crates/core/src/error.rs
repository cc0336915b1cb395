use serde::Serialize;
use thiserror::Error;

/// A user-correctable problem with a request payload.
///
/// Carries the offending field so API layers can return actionable detail.
#[derive(Debug, Clone, Error, Serialize)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Name of the field that failed validation (wire casing).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_field() {
        let err = ValidationError::new("brief", "must be at least 5 characters");
        assert_eq!(err.to_string(), "invalid brief: must be at least 5 characters");
    }
}
