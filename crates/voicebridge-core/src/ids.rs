//! Opaque string identifiers shared across the bridge.
//!
//! These stay as thin newtypes over `String` rather than `Uuid` because the
//! values originate outside the bridge (telephony port identifiers, tenant
//! slugs assigned by the directory service) and are never generated locally.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(SessionId);
string_id!(CallerId);
string_id!(TenantId);
string_id!(AgentId);

impl SessionId {
    /// Generate a new process-wide unique session identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn display_matches_inner_string() {
        let t = TenantId::from("acme-corp");
        assert_eq!(t.to_string(), "acme-corp");
        assert_eq!(t.as_str(), "acme-corp");
    }
}
