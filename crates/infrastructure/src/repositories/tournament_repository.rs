//! Tournament repository implementation.
//!
//! Reads the ranked participant list of a tournament and writes a generated
//! ladder exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument};

use tourney_domain::{
    InsertOutcome, Match, Participant, PlayerRef, TournamentId, TournamentRoster, UserId,
};

use crate::{Error, Result};

/// Tournament data needed to generate and store a ladder.
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Load the tournament's participants ordered by ascending ranking.
    ///
    /// Returns `None` when the tournament does not exist.
    async fn fetch_participants_ordered_by_ranking(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Option<TournamentRoster>>;

    /// Persist `matches` unless the tournament already has matches.
    ///
    /// The existence check and the inserts happen atomically, so concurrent
    /// or repeated executions write at most one batch.
    async fn insert_match_batch_if_absent(
        &self,
        tournament_id: &TournamentId,
        matches: &[Match],
    ) -> Result<InsertOutcome>;
}

/// PostgreSQL implementation of TournamentRepository.
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    /// Create a new PostgreSQL tournament repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    #[instrument(skip(self), fields(tournament_id = %tournament_id))]
    async fn fetch_participants_ordered_by_ranking(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Option<TournamentRoster>> {
        let starts_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT time FROM tournaments WHERE id = $1")
                .bind(tournament_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        let Some(starts_at) = starts_at else {
            debug!("Tournament not found");
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT user_id, ranking, license_number
            FROM tournament_participants
            WHERE tournament_id = $1
            ORDER BY ranking ASC
            "#,
        )
        .bind(tournament_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let participants = rows
            .into_iter()
            .map(|row| -> Result<Participant> {
                let user_id: String = row.try_get("user_id")?;
                let user_id = UserId::parse(user_id)
                    .map_err(|e| Error::InvalidData(format!("participant row: {}", e)))?;
                Ok(Participant::new(
                    user_id,
                    row.try_get("ranking")?,
                    row.try_get("license_number")?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(count = participants.len(), "Loaded participants");

        Ok(Some(TournamentRoster {
            tournament_id: tournament_id.clone(),
            starts_at,
            participants,
        }))
    }

    #[instrument(skip(self, matches), fields(tournament_id = %tournament_id, count = matches.len()))]
    async fn insert_match_batch_if_absent(
        &self,
        tournament_id: &TournamentId,
        matches: &[Match],
    ) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent executions for the same tournament
        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
                .bind(tournament_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Err(Error::NotFound(format!("tournament {}", tournament_id)));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM matches WHERE tournament_id = $1)")
                .bind(tournament_id.as_str())
                .fetch_one(&mut *tx)
                .await?;

        if exists {
            tx.rollback().await?;
            info!("Matches already exist, skipping insert");
            return Ok(InsertOutcome::AlreadyExists);
        }

        for m in matches {
            let (player1_id, player1_description) = columns(&m.player1);
            let (player2_id, player2_description) = columns(&m.player2);

            sqlx::query(
                r#"
                INSERT INTO matches (
                    tournament_id, number, date,
                    player1_id, player1_description,
                    player2_id, player2_description
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(tournament_id.as_str())
            .bind(m.number as i32)
            .bind(m.date)
            .bind(player1_id)
            .bind(player1_description)
            .bind(player2_id)
            .bind(player2_description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Match batch inserted");
        Ok(InsertOutcome::Inserted)
    }
}

/// Split a player reference into the `(player_id, player_description)` columns.
fn columns(player: &PlayerRef) -> (Option<&str>, &str) {
    match player {
        PlayerRef::Participant(user_id) => (Some(user_id.as_str()), ""),
        PlayerRef::Placeholder(text) => (None, text.as_str()),
    }
}
