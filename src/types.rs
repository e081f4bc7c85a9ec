//! NewType wrappers for strong typing throughout the auth crate.
//!
//! These types keep semantically different strings apart (e.g. a role name
//! passed where a username is expected, or a raw session token logged as if
//! it were a username).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Local account name, unique across the user store.
    ///
    /// Federated accounts use the provider's designated field here (the
    /// Google email, the Facebook username).
    Username
);

newtype_string!(
    /// Role name as stored in the role table, e.g. "ADMIN" or "CONTRIBUTOR".
    RoleName
);

newtype_string!(
    /// Signed session token handed to clients after a successful login.
    SessionToken
);

/// Role assigned to accounts provisioned through a federated login.
pub const DEFAULT_ROLE: &str = "CONTRIBUTOR";

/// Role allowed to act on resources owned by other users.
pub const ADMIN_ROLE: &str = "ADMIN";
