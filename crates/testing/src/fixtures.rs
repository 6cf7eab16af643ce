//! Test fixtures for participants and rosters.

use chrono::{Duration, Utc};
use fake::{faker::internet::en::Username, Fake};
use tourney_domain::{Participant, TournamentId, TournamentRoster, UserId};

/// Participants `player-1..=player-n` with rankings `1..=n`
pub fn ranked_participants(n: usize) -> Vec<Participant> {
    (1..=n)
        .map(|rank| participant(&format!("player-{}", rank), rank as i32))
        .collect()
}

/// Participants with generated usernames and rankings `1..=n`
pub fn random_participants(n: usize) -> Vec<Participant> {
    (1..=n)
        .map(|rank| {
            let username: String = Username().fake();
            // Suffix keeps ids unique when the generator repeats a name
            participant(&format!("{}-{}", username, rank), rank as i32)
        })
        .collect()
}

/// A single participant with a license number derived from the ranking
pub fn participant(user_id: &str, ranking: i32) -> Participant {
    Participant::new(
        UserId::parse(user_id).unwrap_or_else(|_| panic!("fixture user id {:?}", user_id)),
        ranking,
        100_000 + ranking as i64,
    )
}

/// A roster of `n` ranked participants for a tournament starting in a week
pub fn roster(tournament_id: &str, n: usize) -> TournamentRoster {
    TournamentRoster {
        tournament_id: tournament_id_of(tournament_id),
        starts_at: Utc::now() + Duration::days(7),
        participants: ranked_participants(n),
    }
}

/// Parse a fixture tournament id
pub fn tournament_id_of(value: &str) -> TournamentId {
    TournamentId::parse(value).unwrap_or_else(|_| panic!("fixture tournament id {:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ranked_participants() {
        let participants = ranked_participants(3);
        assert_eq!(participants.len(), 3);
        assert_eq!(participants[0].user_id.as_str(), "player-1");
        assert_eq!(participants[2].ranking, 3);
    }

    #[test]
    fn test_random_participants_are_unique() {
        let participants = random_participants(50);
        let ids: HashSet<_> = participants.iter().map(|p| p.user_id.clone()).collect();
        assert_eq!(ids.len(), 50);
    }
}
