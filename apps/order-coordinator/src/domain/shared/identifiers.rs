//! Strongly-typed identifiers for orders.
//!
//! The coordinator assigns a local id before the gateway has seen the order
//! and links the gateway's id once it is acknowledged.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    OrderId,
    "Local order identifier, assigned before the gateway acknowledges the order."
);
define_id!(GatewayOrderId, "Gateway's identifier for an acknowledged order.");

impl OrderId {
    /// Generate a new unique local order id.
    ///
    /// The id doubles as the client order id sent with every submit attempt,
    /// so a retried submission is recognizable by the gateway.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("oc-{}", uuid::Uuid::new_v4().simple()))
    }
}
