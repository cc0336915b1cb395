use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// View the value as a `&str`.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the newtype, returning the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_newtype! {
    /// Unique identifier of a [`Task`](crate::Task).
    ///
    /// Assigned at creation; UUID-v4 in canonical string form.
    TaskId
}

string_newtype! {
    /// The isolation boundary a task belongs to.
    ///
    /// A caller may only act within its own tenant unless it presents an
    /// internal service identity.
    TenantId
}

impl TaskId {
    /// Generate a fresh random task id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_inner() {
        let id = TaskId::new("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn generate_is_unique() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }

    #[test]
    fn serde_is_transparent() {
        let tenant = TenantId::new("t1");
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, "\"t1\"");
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tenant);
    }
}
