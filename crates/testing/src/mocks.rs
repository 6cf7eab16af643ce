//! Mock implementations for repositories.
//!
//! Provides in-memory mocks for testing without database dependencies.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tourney_domain::{InsertOutcome, Match, TournamentId, TournamentRoster};
use tourney_infrastructure::{Error, Result, TournamentRepository};

/// Mock tournament repository for testing
///
/// Clones share state, so a test can keep a handle while the worker owns another.
#[derive(Clone, Default)]
pub struct MockTournamentRepository {
    rosters: Arc<RwLock<HashMap<TournamentId, TournamentRoster>>>,
    matches: Arc<RwLock<HashMap<TournamentId, Vec<Match>>>>,
    insert_calls: Arc<AtomicUsize>,
    failing_fetches: Arc<AtomicU32>,
}

impl MockTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`Self::add_roster`]
    pub fn with_roster(self, roster: TournamentRoster) -> Self {
        self.add_roster(roster);
        self
    }

    pub fn add_roster(&self, roster: TournamentRoster) {
        self.rosters
            .write()
            .insert(roster.tournament_id.clone(), roster);
    }

    /// Make the next `count` fetches fail with a transient database error
    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Matches stored for a tournament, if any batch was written
    pub fn matches_for(&self, tournament_id: &TournamentId) -> Option<Vec<Match>> {
        self.matches.read().get(tournament_id).cloned()
    }

    /// Number of insert attempts, including ones that found an existing batch
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TournamentRepository for MockTournamentRepository {
    async fn fetch_participants_ordered_by_ranking(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Option<TournamentRoster>> {
        let should_fail = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }

        Ok(self.rosters.read().get(tournament_id).map(|roster| {
            let mut roster = roster.clone();
            roster.participants.sort_by_key(|p| p.ranking);
            roster
        }))
    }

    async fn insert_match_batch_if_absent(
        &self,
        tournament_id: &TournamentId,
        matches: &[Match],
    ) -> Result<InsertOutcome> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if !self.rosters.read().contains_key(tournament_id) {
            return Err(Error::NotFound(format!("tournament {}", tournament_id)));
        }

        let mut stored = self.matches.write();
        if stored.contains_key(tournament_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        stored.insert(tournament_id.clone(), matches.to_vec());
        Ok(InsertOutcome::Inserted)
    }
}
