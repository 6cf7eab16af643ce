//! Tourney Scheduler Domain Types
//!
//! This crate provides the core domain model for deferred tournament processing.
//! It defines tournament identifiers, participants, bracket matches, the ladder
//! generator, and the error taxonomy shared by the scheduler and the workers.
//!
//! ## Architecture
//!
//! - **identifiers**: Strongly-typed identifiers for tournaments, users and jobs
//! - **tournament**: Participants, rosters, matches and player references
//! - **bracket**: Deterministic single-elimination ladder generation
//! - **errors**: Error types with retry classification and HTTP status codes
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tourney_domain::{generate_ladder, Participant, TournamentId, UserId};
//!
//! let tournament_id = TournamentId::parse("spring-open").unwrap();
//! let participants: Vec<Participant> = (1..=4)
//!     .map(|rank| Participant::new(UserId::parse(format!("user-{rank}")).unwrap(), rank, 1000 + rank as i64))
//!     .collect();
//!
//! let matches = generate_ladder(&tournament_id, Utc::now(), &participants).unwrap();
//! assert_eq!(matches.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bracket;
pub mod errors;
pub mod identifiers;
pub mod tournament;

pub use bracket::generate_ladder;
pub use errors::{AppError, AppResult, PreconditionError};
pub use identifiers::*;
pub use tournament::{InsertOutcome, Match, Participant, PlayerRef, TournamentRoster};
