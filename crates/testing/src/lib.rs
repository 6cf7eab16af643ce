//! Testing utilities for the tourney scheduler
//!
//! This crate provides:
//! - Fixtures for participants and tournament rosters
//! - An in-memory mock of the tournament-data repository
//!
//! # Examples
//!
//! ```
//! use tourney_testing::{fixtures::*, mocks::MockTournamentRepository};
//!
//! let roster = roster("spring-cup", 5);
//! let repository = MockTournamentRepository::new().with_roster(roster);
//! assert_eq!(repository.insert_calls(), 0);
//! ```

pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use fixtures::*;
pub use mocks::*;

// Re-export testing dependencies for convenience
pub use fake;
