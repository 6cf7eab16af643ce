//! Scheduled job record and its payload

use super::{QueueError, QueueResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tourney_domain::{JobId, JobKey, TournamentId};

/// Data carried by a tournament processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub tournament_id: TournamentId,
    /// The deadline the job was scheduled for
    pub application_deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_data: Option<serde_json::Value>,
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for its due time, or for a retry
    Delayed,
    /// Claimed by a worker that holds the lease
    Active,
    /// Handler finished successfully
    Completed,
    /// Failed terminally
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delayed => "delayed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delayed" => Ok(Self::Delayed),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(QueueError::CorruptRecord(format!("unknown state '{}'", other))),
        }
    }
}

/// A job owned by the delay queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: JobId,
    pub key: JobKey,
    pub payload: JobPayload,
    pub state: JobState,
    /// Execution attempts started so far
    pub attempts: u32,
    pub max_attempts: u32,
    pub due_at: DateTime<Utc>,
    pub lease_until: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledJob {
    /// Create a delayed job due at `due_at`
    pub fn new(key: JobKey, payload: JobPayload, due_at: DateTime<Utc>, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            key,
            payload,
            state: JobState::Delayed,
            attempts: 0,
            max_attempts,
            due_at,
            lease_until: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tournament_id(&self) -> &TournamentId {
        &self.payload.tournament_id
    }

    /// Whether another attempt is allowed after the current one
    pub fn should_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Rebuild a job from its Redis hash fields
    pub fn from_fields(fields: &HashMap<String, String>) -> QueueResult<Self> {
        let get = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| QueueError::CorruptRecord(format!("missing field '{}'", name)))
        };
        let number = |name: &str| -> QueueResult<i64> {
            get(name)?
                .parse()
                .map_err(|_| QueueError::CorruptRecord(format!("field '{}' is not a number", name)))
        };
        let timestamp = |name: &str| -> QueueResult<DateTime<Utc>> { from_millis(number(name)?) };
        let optional = |name: &str| fields.get(name).filter(|v| !v.is_empty());

        let id = get("id")?
            .parse()
            .map_err(|_| QueueError::CorruptRecord("invalid job id".to_string()))?;

        Ok(Self {
            id,
            key: JobKey::from_raw(get("key")?.as_str()),
            payload: serde_json::from_str(get("payload")?)?,
            state: get("state")?.parse()?,
            attempts: number("attempts")? as u32,
            max_attempts: number("max_attempts")? as u32,
            due_at: timestamp("due_at")?,
            lease_until: match optional("lease_until") {
                Some(_) => Some(timestamp("lease_until")?),
                None => None,
            },
            last_error: optional("last_error").cloned(),
            created_at: timestamp("created_at")?,
            updated_at: timestamp("updated_at")?,
        })
    }

    /// Rebuild a job from a flat `HGETALL` reply
    pub fn from_flat_fields(flat: Vec<String>) -> QueueResult<Self> {
        let mut fields = HashMap::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
            fields.insert(name, value);
        }
        Self::from_fields(&fields)
    }
}

/// Milliseconds since the Unix epoch, as stored in the queue
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(ms: i64) -> QueueResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| QueueError::CorruptRecord(format!("timestamp {} out of range", ms)))
}
