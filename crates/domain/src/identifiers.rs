//! Strongly-typed identifiers for the tournament scheduling domain.
//!
//! Tournament and user identifiers are opaque strings owned by the web tier
//! (they are never generated here), so they are validated for emptiness and
//! otherwise carried verbatim. Job identifiers are generated by the delay
//! queue and use UUID v7 so they sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

/// Error returned when an opaque identifier is blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must not be empty")]
pub struct EmptyIdentifier {
    /// Name of the identifier type that was rejected
    pub kind: &'static str,
}

macro_rules! define_external_id {
    ($name:ident, $kind:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting blank values
            pub fn parse(value: impl Into<String>) -> Result<Self, EmptyIdentifier> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(EmptyIdentifier { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = EmptyIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_external_id!(
    TournamentId,
    "tournamentId",
    "Identifier of a tournament, as assigned by the web tier"
);

define_external_id!(
    UserId,
    "userId",
    "Identifier of a registered user taking part in a tournament"
);

/// Unique identifier of a scheduled job (UUID v7 for time-ordering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new time-ordered job ID
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get a reference to the underlying UUID
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Stable queue key for a tournament; one job slot per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    /// The key used for a tournament's ladder-generation job
    pub fn for_tournament(tournament_id: &TournamentId) -> Self {
        Self(format!("tournament-{}", tournament_id))
    }

    /// Rebuild a key from its stored representation
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the key as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
