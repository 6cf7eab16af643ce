//! Single-elimination ladder generation.
//!
//! The ladder seeds the strongest participant against the weakest, the second
//! strongest against the second weakest and so on. An odd field first plays a
//! preliminary match between its two weakest participants. Later rounds refer to
//! earlier matches through `"Winner of Match N"` placeholders, so the output is
//! a forward-only chain ending in a single final.

use crate::errors::PreconditionError;
use crate::identifiers::TournamentId;
use crate::tournament::{Match, Participant, PlayerRef};
use chrono::{DateTime, Utc};

/// Minimum field size for a ladder
pub const MIN_PARTICIPANTS: usize = 2;

/// Generate the full ladder for a tournament.
///
/// Participants may arrive in any order; they are seeded by ascending
/// `ranking`. Matches are numbered from 1 in creation order and all carry
/// `date`. The same input always yields the same matches.
///
/// # Errors
///
/// Returns [`PreconditionError::NotEnoughParticipants`] for fewer than two
/// participants and [`PreconditionError::DuplicateRanking`] when two
/// participants share a ranking.
pub fn generate_ladder(
    tournament_id: &TournamentId,
    date: DateTime<Utc>,
    participants: &[Participant],
) -> Result<Vec<Match>, PreconditionError> {
    if participants.len() < MIN_PARTICIPANTS {
        return Err(PreconditionError::NotEnoughParticipants {
            count: participants.len(),
        });
    }

    let mut seeded: Vec<&Participant> = participants.iter().collect();
    seeded.sort_by_key(|p| p.ranking);
    if let Some(pair) = seeded.windows(2).find(|w| w[0].ranking == w[1].ranking) {
        return Err(PreconditionError::DuplicateRanking {
            ranking: pair[0].ranking,
        });
    }

    let mut builder = LadderBuilder {
        tournament_id,
        date,
        matches: Vec::with_capacity(participants.len() - 1),
    };

    let mut slots: Vec<PlayerRef> = seeded
        .iter()
        .map(|p| PlayerRef::Participant(p.user_id.clone()))
        .collect();

    while slots.len() > 1 {
        if slots.len() % 2 != 0 {
            builder.play_preliminary(&mut slots);
        }

        let count = slots.len();
        let mut next_round = Vec::with_capacity(count / 2);
        for i in 0..count / 2 {
            let number = builder.push(slots[i].clone(), slots[count - 1 - i].clone());
            next_round.push(PlayerRef::winner_of(number));
        }
        slots = next_round;
    }

    Ok(builder.matches)
}

struct LadderBuilder<'a> {
    tournament_id: &'a TournamentId,
    date: DateTime<Utc>,
    matches: Vec<Match>,
}

impl LadderBuilder<'_> {
    fn push(&mut self, player1: PlayerRef, player2: PlayerRef) -> u32 {
        let number = self.matches.len() as u32 + 1;
        self.matches.push(Match {
            number,
            tournament_id: self.tournament_id.clone(),
            date: self.date,
            player1,
            player2,
        });
        number
    }

    /// Replace the two weakest slots with the winner of a match between them.
    fn play_preliminary(&mut self, slots: &mut Vec<PlayerRef>) {
        if let (Some(weakest), Some(second_weakest)) = (slots.pop(), slots.pop()) {
            let number = self.push(weakest, second_weakest);
            slots.push(PlayerRef::winner_of(number));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::UserId;
    use chrono::TimeZone;

    fn field(n: i32) -> Vec<Participant> {
        (1..=n)
            .map(|rank| {
                Participant::new(
                    UserId::parse(format!("p{}", rank)).unwrap(),
                    rank,
                    10_000 + rank as i64,
                )
            })
            .collect()
    }

    fn tournament() -> TournamentId {
        TournamentId::parse("open-2024").unwrap()
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn player(id: &str) -> PlayerRef {
        PlayerRef::Participant(UserId::parse(id).unwrap())
    }

    fn pairing(m: &Match) -> (PlayerRef, PlayerRef) {
        (m.player1.clone(), m.player2.clone())
    }

    #[test]
    fn test_four_participants() {
        let matches = generate_ladder(&tournament(), date(), &field(4)).unwrap();

        assert_eq!(matches.len(), 3);
        assert_eq!(pairing(&matches[0]), (player("p1"), player("p4")));
        assert_eq!(pairing(&matches[1]), (player("p2"), player("p3")));
        assert_eq!(
            pairing(&matches[2]),
            (PlayerRef::winner_of(1), PlayerRef::winner_of(2))
        );
    }

    #[test]
    fn test_five_participants_play_preliminary() {
        let matches = generate_ladder(&tournament(), date(), &field(5)).unwrap();

        assert_eq!(matches.len(), 4);
        assert_eq!(pairing(&matches[0]), (player("p5"), player("p4")));
        assert_eq!(pairing(&matches[1]), (player("p1"), PlayerRef::winner_of(1)));
        assert_eq!(pairing(&matches[2]), (player("p2"), player("p3")));
        assert_eq!(
            pairing(&matches[3]),
            (PlayerRef::winner_of(2), PlayerRef::winner_of(3))
        );
    }

    #[test]
    fn test_six_participants_odd_second_round() {
        let matches = generate_ladder(&tournament(), date(), &field(6)).unwrap();

        assert_eq!(matches.len(), 5);
        assert_eq!(pairing(&matches[0]), (player("p1"), player("p6")));
        assert_eq!(pairing(&matches[1]), (player("p2"), player("p5")));
        assert_eq!(pairing(&matches[2]), (player("p3"), player("p4")));
        assert_eq!(
            pairing(&matches[3]),
            (PlayerRef::winner_of(3), PlayerRef::winner_of(2))
        );
        assert_eq!(
            pairing(&matches[4]),
            (PlayerRef::winner_of(1), PlayerRef::winner_of(4))
        );
    }

    #[test]
    fn test_two_participants_single_final() {
        let matches = generate_ladder(&tournament(), date(), &field(2)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(pairing(&matches[0]), (player("p1"), player("p2")));
    }

    #[test]
    fn test_unsorted_input_is_seeded_by_ranking() {
        let mut participants = field(4);
        participants.reverse();
        let shuffled = generate_ladder(&tournament(), date(), &participants).unwrap();
        let sorted = generate_ladder(&tournament(), date(), &field(4)).unwrap();
        assert_eq!(shuffled, sorted);
    }

    #[test]
    fn test_matches_carry_tournament_and_date() {
        let matches = generate_ladder(&tournament(), date(), &field(7)).unwrap();
        assert!(matches
            .iter()
            .all(|m| m.tournament_id == tournament() && m.date == date()));
    }

    #[test]
    fn test_too_few_participants() {
        assert_eq!(
            generate_ladder(&tournament(), date(), &[]),
            Err(PreconditionError::NotEnoughParticipants { count: 0 })
        );
        assert_eq!(
            generate_ladder(&tournament(), date(), &field(1)),
            Err(PreconditionError::NotEnoughParticipants { count: 1 })
        );
    }

    #[test]
    fn test_duplicate_ranking_rejected() {
        let mut participants = field(3);
        participants[2].ranking = 2;
        assert_eq!(
            generate_ladder(&tournament(), date(), &participants),
            Err(PreconditionError::DuplicateRanking { ranking: 2 })
        );
    }
}
