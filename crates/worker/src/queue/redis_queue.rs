//! Redis-backed delay queue
//!
//! Layout under the configured prefix `P`:
//!
//! - `P:delayed`    sorted set of job ids scored by due time (ms)
//! - `P:active`     sorted set of leased job ids scored by lease expiry (ms)
//! - `P:job:{id}`   hash holding the job record
//! - `P:key:{key}`  job id currently owning a job key
//! - `P:completed`, `P:failed`  retained terminal job ids, newest first
//!
//! Every state transition runs as a single Lua script, so the key index and
//! the two sorted sets never disagree. Scripts touch per-job keys derived from
//! the prefix, which keeps the queue on a single Redis node.

use super::job::{to_millis, JobPayload, ScheduledJob};
use super::{AckOutcome, DelayQueue, FailureDisposition, QueueError, QueueResult, UpsertOutcome};
use crate::config::{QueueConfig, RetryConfig};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;
use tourney_domain::{JobId, JobKey};
use tracing::{debug, info, instrument, warn};

const HELPERS: &str = r#"
local function release_key(prefix, id)
  local key = redis.call('HGET', prefix .. ':job:' .. id, 'key')
  if key then
    local index = prefix .. ':key:' .. key
    if redis.call('GET', index) == id then
      redis.call('DEL', index)
    end
  end
end

local function retain(list, id, keep, prefix)
  if keep <= 0 then
    redis.call('DEL', prefix .. ':job:' .. id)
    return
  end
  redis.call('LPUSH', list, id)
  while redis.call('LLEN', list) > keep do
    local evicted = redis.call('RPOP', list)
    redis.call('DEL', prefix .. ':job:' .. evicted)
  end
end
"#;

// KEYS: delayed, active, key index
// ARGV: prefix, id, due_at, job key, payload, max_attempts, now
const UPSERT: &str = r#"
local prefix = ARGV[1]
local id = ARGV[2]
local old = redis.call('GET', KEYS[3])
if old then
  if redis.call('ZSCORE', KEYS[2], old) then
    return {'conflict', old}
  end
  redis.call('ZREM', KEYS[1], old)
  redis.call('DEL', prefix .. ':job:' .. old)
end
redis.call('HSET', prefix .. ':job:' .. id,
  'id', id, 'key', ARGV[4], 'payload', ARGV[5], 'state', 'delayed',
  'attempts', '0', 'max_attempts', ARGV[6], 'due_at', ARGV[3],
  'lease_until', '', 'last_error', '',
  'created_at', ARGV[7], 'updated_at', ARGV[7])
redis.call('ZADD', KEYS[1], ARGV[3], id)
redis.call('SET', KEYS[3], id)
if old then
  return {'replaced', old}
end
return {'inserted', ''}
"#;

// KEYS: delayed, active, failed
// ARGV: prefix, now, lease ms, keep_failed
const CLAIM: &str = r#"
local prefix = ARGV[1]
local now = tonumber(ARGV[2])
local expired = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', now)
for _, id in ipairs(expired) do
  redis.call('ZREM', KEYS[2], id)
  local hash = prefix .. ':job:' .. id
  local attempts = tonumber(redis.call('HGET', hash, 'attempts') or '0')
  local max = tonumber(redis.call('HGET', hash, 'max_attempts') or '0')
  if attempts >= max then
    redis.call('HSET', hash, 'state', 'failed', 'lease_until', '',
      'last_error', 'lease expired after final attempt', 'updated_at', ARGV[2])
    release_key(prefix, id)
    retain(KEYS[3], id, tonumber(ARGV[4]), prefix)
  else
    redis.call('HSET', hash, 'state', 'delayed', 'lease_until', '',
      'due_at', ARGV[2], 'updated_at', ARGV[2])
    redis.call('ZADD', KEYS[1], now, id)
  end
end

local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', now, 'LIMIT', 0, 1)
if #due == 0 then
  return false
end
local id = due[1]
local hash = prefix .. ':job:' .. id
local lease = now + tonumber(ARGV[3])
redis.call('ZREM', KEYS[1], id)
redis.call('ZADD', KEYS[2], lease, id)
redis.call('HINCRBY', hash, 'attempts', 1)
redis.call('HSET', hash, 'state', 'active', 'lease_until', tostring(lease), 'updated_at', ARGV[2])
return redis.call('HGETALL', hash)
"#;

// KEYS: active, completed
// ARGV: prefix, id, attempts, now, keep_completed
const COMPLETE: &str = r#"
local prefix = ARGV[1]
local id = ARGV[2]
local hash = prefix .. ':job:' .. id
if not redis.call('ZSCORE', KEYS[1], id) or redis.call('HGET', hash, 'attempts') ~= ARGV[3] then
  return 'stale'
end
redis.call('ZREM', KEYS[1], id)
release_key(prefix, id)
redis.call('HSET', hash, 'state', 'completed', 'lease_until', '', 'updated_at', ARGV[4])
retain(KEYS[2], id, tonumber(ARGV[5]), prefix)
return 'acknowledged'
"#;

// KEYS: delayed, active, failed
// ARGV: prefix, id, attempts, now, retryable, retry_at, reason, keep_failed
const FAIL: &str = r#"
local prefix = ARGV[1]
local id = ARGV[2]
local hash = prefix .. ':job:' .. id
if not redis.call('ZSCORE', KEYS[2], id) or redis.call('HGET', hash, 'attempts') ~= ARGV[3] then
  return 'stale'
end
redis.call('ZREM', KEYS[2], id)
local attempts = tonumber(ARGV[3])
local max = tonumber(redis.call('HGET', hash, 'max_attempts') or '0')
if ARGV[5] == '1' and attempts < max then
  redis.call('HSET', hash, 'state', 'delayed', 'due_at', ARGV[6], 'lease_until', '',
    'last_error', ARGV[7], 'updated_at', ARGV[4])
  redis.call('ZADD', KEYS[1], ARGV[6], id)
  return 'retrying'
end
redis.call('HSET', hash, 'state', 'failed', 'lease_until', '',
  'last_error', ARGV[7], 'updated_at', ARGV[4])
release_key(prefix, id)
retain(KEYS[3], id, tonumber(ARGV[8]), prefix)
return 'failed'
"#;

fn script(body: &str) -> Script {
    Script::new(&format!("{}{}", HELPERS, body))
}

/// Delay queue stored in Redis
#[derive(Clone)]
pub struct RedisDelayQueue {
    redis: ConnectionManager,
    queue: QueueConfig,
    retry: RetryConfig,
    upsert_script: Script,
    claim_script: Script,
    complete_script: Script,
    fail_script: Script,
}

impl RedisDelayQueue {
    /// Connect to Redis and prepare the queue scripts
    pub async fn connect(redis_url: &str, queue: QueueConfig, retry: RetryConfig) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        info!(prefix = %queue.prefix, "Connected delay queue to Redis");

        Ok(Self::from_connection(redis, queue, retry))
    }

    /// Wrap an existing connection
    pub fn from_connection(redis: ConnectionManager, queue: QueueConfig, retry: RetryConfig) -> Self {
        Self {
            redis,
            queue,
            retry,
            upsert_script: script(UPSERT),
            claim_script: script(CLAIM),
            complete_script: script(COMPLETE),
            fail_script: script(FAIL),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.queue.prefix, suffix)
    }

    fn job_key(&self, id: &str) -> String {
        format!("{}:job:{}", self.queue.prefix, id)
    }

    fn index_key(&self, key: &JobKey) -> String {
        format!("{}:key:{}", self.queue.prefix, key)
    }

    async fn load(&self, conn: &mut ConnectionManager, id: &str) -> QueueResult<Option<ScheduledJob>> {
        let fields: HashMap<String, String> = conn.hgetall(self.job_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        ScheduledJob::from_fields(&fields).map(Some)
    }
}

#[async_trait]
impl DelayQueue for RedisDelayQueue {
    #[instrument(skip(self, payload), fields(key = %key))]
    async fn upsert(
        &self,
        key: &JobKey,
        payload: JobPayload,
        delay: Duration,
    ) -> QueueResult<UpsertOutcome> {
        let mut conn = self.redis.clone();
        let now = Utc::now();
        let due_at = now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        let job_id = JobId::new();
        let payload = serde_json::to_string(&payload)?;

        let reply: Vec<String> = self
            .upsert_script
            .key(self.key("delayed"))
            .key(self.key("active"))
            .key(self.index_key(key))
            .arg(&self.queue.prefix)
            .arg(job_id.to_string())
            .arg(to_millis(due_at))
            .arg(key.as_str())
            .arg(payload)
            .arg(self.retry.max_attempts)
            .arg(to_millis(now))
            .invoke_async(&mut conn)
            .await?;

        let parse_id = |raw: &str| {
            raw.parse::<JobId>()
                .map_err(|_| QueueError::CorruptRecord(format!("invalid job id '{}'", raw)))
        };

        match reply.as_slice() {
            [status, existing] if status == "conflict" => Err(QueueError::ActiveConflict {
                key: key.clone(),
                job_id: parse_id(existing)?,
            }),
            [status, existing] if status == "replaced" => {
                let replaced = parse_id(existing)?;
                debug!(key = %key, job_id = %job_id, replaced = %replaced, "Job replaced");
                Ok(UpsertOutcome {
                    job_id,
                    due_at,
                    replaced: Some(replaced),
                })
            }
            [status, _] if status == "inserted" => {
                debug!(key = %key, job_id = %job_id, "Job inserted");
                Ok(UpsertOutcome {
                    job_id,
                    due_at,
                    replaced: None,
                })
            }
            other => Err(QueueError::CorruptRecord(format!(
                "unexpected upsert reply {:?}",
                other
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn claim_due(&self) -> QueueResult<Option<ScheduledJob>> {
        let mut conn = self.redis.clone();

        let reply: Option<Vec<String>> = self
            .claim_script
            .key(self.key("delayed"))
            .key(self.key("active"))
            .key(self.key("failed"))
            .arg(&self.queue.prefix)
            .arg(to_millis(Utc::now()))
            .arg(self.queue.lease_timeout().num_milliseconds())
            .arg(self.queue.keep_failed)
            .invoke_async(&mut conn)
            .await?;

        match reply {
            Some(flat) if !flat.is_empty() => ScheduledJob::from_flat_fields(flat).map(Some),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, attempts = job.attempts))]
    async fn mark_completed(&self, job: &ScheduledJob) -> QueueResult<AckOutcome> {
        let mut conn = self.redis.clone();

        let reply: String = self
            .complete_script
            .key(self.key("active"))
            .key(self.key("completed"))
            .arg(&self.queue.prefix)
            .arg(job.id.to_string())
            .arg(job.attempts)
            .arg(to_millis(Utc::now()))
            .arg(self.queue.keep_completed)
            .invoke_async(&mut conn)
            .await?;

        match reply.as_str() {
            "acknowledged" => Ok(AckOutcome::Acknowledged),
            "stale" => Ok(AckOutcome::Stale),
            other => Err(QueueError::CorruptRecord(format!(
                "unexpected completion reply '{}'",
                other
            ))),
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, attempts = job.attempts))]
    async fn mark_failed(
        &self,
        job: &ScheduledJob,
        reason: &str,
        retryable: bool,
    ) -> QueueResult<FailureDisposition> {
        let mut conn = self.redis.clone();
        let now = Utc::now();
        let backoff = self.retry.calculate_backoff(job.attempts);
        let retry_at = now + chrono::Duration::from_std(backoff).unwrap_or(chrono::Duration::zero());

        let reply: String = self
            .fail_script
            .key(self.key("delayed"))
            .key(self.key("active"))
            .key(self.key("failed"))
            .arg(&self.queue.prefix)
            .arg(job.id.to_string())
            .arg(job.attempts)
            .arg(to_millis(now))
            .arg(if retryable { "1" } else { "0" })
            .arg(to_millis(retry_at))
            .arg(reason)
            .arg(self.queue.keep_failed)
            .invoke_async(&mut conn)
            .await?;

        match reply.as_str() {
            "retrying" => Ok(FailureDisposition::Retrying { due_at: retry_at }),
            "failed" => Ok(FailureDisposition::Terminal),
            "stale" => {
                warn!(job_id = %job.id, "Failure reported for a job whose lease was lost");
                Ok(FailureDisposition::Stale)
            }
            other => Err(QueueError::CorruptRecord(format!(
                "unexpected failure reply '{}'",
                other
            ))),
        }
    }

    async fn pending(&self, key: &JobKey) -> QueueResult<Option<ScheduledJob>> {
        let mut conn = self.redis.clone();
        let id: Option<String> = conn.get(self.index_key(key)).await?;

        match id {
            Some(id) => self.load(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    async fn failed_jobs(&self, limit: usize) -> QueueResult<Vec<ScheduledJob>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.clone();
        let ids: Vec<String> = conn
            .lrange(self.key("failed"), 0, limit as isize - 1)
            .await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.load(&mut conn, &id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn health_check(&self) -> QueueResult<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobState;
    use tourney_domain::TournamentId;

    async fn queue(prefix: &str) -> RedisDelayQueue {
        queue_with(prefix, QueueConfig::default(), RetryConfig::default()).await
    }

    async fn queue_with(prefix: &str, config: QueueConfig, retry: RetryConfig) -> RedisDelayQueue {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let config = QueueConfig {
            prefix: format!("test:{}:{}", prefix, JobId::new()),
            ..config
        };
        RedisDelayQueue::connect(&url, config, retry)
            .await
            .expect("Redis must be reachable at REDIS_URL")
    }

    fn short_lease(lease_timeout_ms: u64) -> QueueConfig {
        QueueConfig {
            lease_timeout_ms,
            ..Default::default()
        }
    }

    fn linear_retry(max_attempts: u32, initial_backoff_ms: u64) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff_ms,
            exponential_backoff: false,
            ..Default::default()
        }
    }

    fn key(id: &str) -> JobKey {
        JobKey::for_tournament(&TournamentId::parse(id).unwrap())
    }

    fn payload(id: &str) -> JobPayload {
        JobPayload {
            tournament_id: TournamentId::parse(id).unwrap(),
            application_deadline: Utc::now(),
            processing_data: None,
        }
    }

    #[test]
    fn test_scripts_include_helpers() {
        for body in [UPSERT, CLAIM, COMPLETE, FAIL] {
            let source = format!("{}{}", HELPERS, body);
            assert!(source.contains("local function retain"));
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_upsert_claim_complete() {
        let queue = queue("lifecycle").await;
        let key = JobKey::for_tournament(&TournamentId::parse("t1").unwrap());

        let first = queue
            .upsert(&key, payload("t1"), Duration::from_secs(3600))
            .await
            .unwrap();
        let second = queue.upsert(&key, payload("t1"), Duration::ZERO).await.unwrap();
        assert_eq!(second.replaced, Some(first.job_id));

        let claimed = queue.claim_due().await.unwrap().unwrap();
        assert_eq!(claimed.id, second.job_id);
        assert_eq!(claimed.state, JobState::Active);
        assert_eq!(claimed.attempts, 1);

        let conflict = queue.upsert(&key, payload("t1"), Duration::ZERO).await;
        assert!(matches!(conflict, Err(QueueError::ActiveConflict { .. })));

        assert_eq!(
            queue.mark_completed(&claimed).await.unwrap(),
            AckOutcome::Acknowledged
        );
        assert!(queue.pending(&key).await.unwrap().is_none());
        assert_eq!(queue.mark_completed(&claimed).await.unwrap(), AckOutcome::Stale);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_terminal_failure_is_retained() {
        let queue = queue("failures").await;
        let key = JobKey::for_tournament(&TournamentId::parse("t2").unwrap());

        queue.upsert(&key, payload("t2"), Duration::ZERO).await.unwrap();
        let claimed = queue.claim_due().await.unwrap().unwrap();

        let disposition = queue.mark_failed(&claimed, "no roster", false).await.unwrap();
        assert_eq!(disposition, FailureDisposition::Terminal);

        let failed = queue.failed_jobs(5).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("no roster"));
        assert!(queue.pending(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_expired_lease_is_redelivered() {
        let queue = queue_with("lease", short_lease(50), linear_retry(3, 0)).await;
        queue.upsert(&key("t1"), payload("t1"), Duration::ZERO).await.unwrap();

        let first = queue.claim_due().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let second = queue.claim_due().await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 2);

        assert_eq!(queue.mark_completed(&first).await.unwrap(), AckOutcome::Stale);
        assert_eq!(
            queue.mark_completed(&second).await.unwrap(),
            AckOutcome::Acknowledged
        );
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_expired_lease_on_last_attempt_is_terminal() {
        let queue = queue_with("exhausted", short_lease(50), linear_retry(1, 0)).await;
        queue.upsert(&key("t1"), payload("t1"), Duration::ZERO).await.unwrap();

        queue.claim_due().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(queue.claim_due().await.unwrap().is_none());
        let failed = queue.failed_jobs(5).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].state, JobState::Failed);
        assert_eq!(
            failed[0].last_error.as_deref(),
            Some("lease expired after final attempt")
        );
        assert!(queue.pending(&key("t1")).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_retryable_failure_waits_for_backoff() {
        let queue = queue_with("retry", QueueConfig::default(), linear_retry(2, 200)).await;
        queue.upsert(&key("t1"), payload("t1"), Duration::ZERO).await.unwrap();

        let first = queue.claim_due().await.unwrap().unwrap();
        let before = Utc::now();
        let disposition = queue.mark_failed(&first, "db down", true).await.unwrap();
        let FailureDisposition::Retrying { due_at } = disposition else {
            panic!("expected a retry, got {:?}", disposition);
        };
        assert!(due_at >= before + chrono::Duration::milliseconds(200));

        let pending = queue.pending(&key("t1")).await.unwrap().unwrap();
        assert_eq!(pending.state, JobState::Delayed);
        assert_eq!(pending.last_error.as_deref(), Some("db down"));

        // Not claimable until the backoff has passed
        assert!(queue.claim_due().await.unwrap().is_none());
        tokio::time::sleep(Duration::from_millis(300)).await;

        let second = queue.claim_due().await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 2);

        let disposition = queue.mark_failed(&second, "db down", true).await.unwrap();
        assert_eq!(disposition, FailureDisposition::Terminal);
        assert_eq!(queue.failed_jobs(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_failed_retention_is_bounded() {
        let queue = queue("retention").await;
        for i in 0..7 {
            let id = format!("t{}", i);
            queue.upsert(&key(&id), payload(&id), Duration::ZERO).await.unwrap();
            let claimed = queue.claim_due().await.unwrap().unwrap();
            queue.mark_failed(&claimed, "bad", false).await.unwrap();
        }

        let failed = queue.failed_jobs(100).await.unwrap();
        assert_eq!(failed.len(), 5);
        assert_eq!(failed[0].tournament_id().as_str(), "t6");

        // Evicted records are deleted, not just unlisted
        let mut conn = queue.redis.clone();
        let stored: Vec<String> = conn
            .keys(format!("{}:job:*", queue.queue.prefix))
            .await
            .unwrap();
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_health_check_pings_server() {
        queue("health").await.health_check().await.unwrap();
    }
}
