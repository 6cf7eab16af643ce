//! Tournament participants, rosters and bracket matches.

use crate::identifiers::{TournamentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant as ranked for ladder seeding.
///
/// Lower `ranking` values are stronger players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// The participating user
    pub user_id: UserId,
    /// Seeding rank, unique per tournament
    pub ranking: i32,
    /// Federation license number
    pub license_number: i64,
}

impl Participant {
    /// Create a new participant
    pub fn new(user_id: UserId, ranking: i32, license_number: i64) -> Self {
        Self {
            user_id,
            ranking,
            license_number,
        }
    }
}

/// Tournament data the ladder worker reads at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentRoster {
    /// The tournament
    pub tournament_id: TournamentId,
    /// When the tournament is played; every generated match carries this date
    pub starts_at: DateTime<Utc>,
    /// Participants ordered by ascending ranking
    pub participants: Vec<Participant>,
}

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlayerRef {
    /// A known participant
    Participant(UserId),
    /// A not-yet-decided player, e.g. "Winner of Match 3"
    Placeholder(String),
}

impl PlayerRef {
    /// Placeholder standing for the winner of `match_number`
    pub fn winner_of(match_number: u32) -> Self {
        Self::Placeholder(format!("Winner of Match {}", match_number))
    }

    /// The resolved participant, if any
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Participant(id) => Some(id),
            Self::Placeholder(_) => None,
        }
    }

    /// The placeholder text, if any
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Participant(_) => None,
            Self::Placeholder(text) => Some(text),
        }
    }

    /// Match number referenced by a placeholder
    pub fn referenced_match(&self) -> Option<u32> {
        self.description()
            .and_then(|text| text.strip_prefix("Winner of Match "))
            .and_then(|number| number.parse().ok())
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant(id) => write!(f, "{}", id),
            Self::Placeholder(text) => f.write_str(text),
        }
    }
}

/// A bracket match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Sequential number within the tournament, starting at 1
    pub number: u32,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Scheduled date
    pub date: DateTime<Utc>,
    /// First player
    pub player1: PlayerRef,
    /// Second player
    pub player2: PlayerRef,
}

/// Result of persisting a generated bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// The batch was written
    Inserted,
    /// Matches already existed for the tournament; nothing was written
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_text() {
        let placeholder = PlayerRef::winner_of(7);
        assert_eq!(placeholder.description(), Some("Winner of Match 7"));
        assert_eq!(placeholder.referenced_match(), Some(7));
        assert!(placeholder.user_id().is_none());
    }

    #[test]
    fn test_participant_ref_has_no_reference() {
        let player = PlayerRef::Participant(UserId::parse("u1").unwrap());
        assert_eq!(player.referenced_match(), None);
        assert_eq!(player.to_string(), "u1");
    }
}
