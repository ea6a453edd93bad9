//! Identity and ordering types for roomsync.
//!
//! Every identifier issued by the homeserver is opaque to the client, so each
//! one is a thin string newtype. The newtypes exist to stop a room id from
//! being passed where an account id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, rejecting the empty string.
            pub fn new(value: impl Into<String>) -> Result<Self, TypesError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(TypesError::InvalidId {
                        kind: $label,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier and return the inner string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypesError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// The local account a sync loop runs for (e.g. `@bot:example.org`).
    ///
    /// Used as the key into the cursor store and as the subject of the
    /// join-flood check.
    AccountId,
    "account"
);

string_id!(
    /// A room identifier (e.g. `!abc:example.org`).
    RoomId,
    "room"
);

string_id!(
    /// A server-assigned identifier for an uploaded filter definition.
    FilterId,
    "filter"
);

/// An opaque, server-issued sync position (the "since" token).
///
/// The empty cursor denotes the initial sync. Cursors carry no ordering:
/// only equality and "was used for the last successful poll" matter.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor from a server token. An empty token is the initial cursor.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The cursor used for the very first sync of an account.
    pub fn initial() -> Self {
        Self(String::new())
    }

    /// Whether this cursor denotes the initial sync.
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            f.write_str("Cursor(<initial>)")
        } else {
            write!(f, "Cursor({})", self.0)
        }
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}
