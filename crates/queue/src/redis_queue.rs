use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script};
use tracing::{info, warn};

use copydesk_core::{Job, JobId};

use crate::config::QueueConfig;
use crate::dispatcher::JobDispatcher;
use crate::error::QueueError;
use crate::source::JobSource;

/// Atomically pop one due job from the ready set and fetch its payload.
///
/// KEYS[1] = ready zset, KEYS[2] = payload hash; ARGV[1] = now (ms).
/// Returns `{id, payload}` or nil. Running as a script keeps claim + remove
/// atomic across concurrent worker instances.
const CLAIM_DUE: &str = r"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
if #due == 0 then
  return nil
end
local id = due[1]
redis.call('ZREM', KEYS[1], id)
local payload = redis.call('HGET', KEYS[2], id)
redis.call('HDEL', KEYS[2], id)
return {id, payload}
";

/// Redis-backed job queue.
///
/// Jobs sit in a sorted set scored by their ready time, so delayed
/// redeliveries and fresh enqueues share one delivery path. Finished and
/// exhausted jobs land in capped lists to bound storage growth.
pub struct RedisJobQueue {
    pool: Pool,
    config: QueueConfig,
}

impl RedisJobQueue {
    /// Create a queue from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Connection`] if the pool cannot be created.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let cfg = Config::from_url(&config.redis_url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| QueueError::Connection(e.to_string()))?
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        info!(queue = %config.queue_name, "queue initialized");
        Ok(Self { pool, config })
    }

    fn ready_key(&self) -> String {
        format!("{}:ready", self.config.queue_name)
    }

    fn jobs_key(&self) -> String {
        format!("{}:jobs", self.config.queue_name)
    }

    fn completed_key(&self) -> String {
        format!("{}:completed", self.config.queue_name)
    }

    fn failed_key(&self) -> String {
        format!("{}:failed", self.config.queue_name)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    /// Put a job on the ready set, due after `delay`.
    async fn schedule(&self, job: &Job, delay: Duration) -> Result<JobId, QueueError> {
        let id = JobId::generate();
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let ready_at = now_ms().saturating_add(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX));

        let mut conn = self.conn().await?;
        let _: () = conn
            .hset(self.jobs_key(), id.as_str(), payload)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let _: () = conn
            .zadd(self.ready_key(), id.as_str(), ready_at)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        Ok(id)
    }

    /// Push onto a capped retention list.
    async fn record(&self, key: &str, entry: &str, cap: usize) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .lpush(key, entry)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let upper = isize::try_from(cap).unwrap_or(isize::MAX).saturating_sub(1);
        let _: () = conn
            .ltrim(key, 0, upper)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl JobDispatcher for RedisJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<Option<JobId>, QueueError> {
        let id = self.schedule(job, Duration::ZERO).await?;
        info!(job_id = %id, task_id = %job.task_id, "job added to queue");
        Ok(Some(id))
    }

    fn is_backed(&self) -> bool {
        true
    }
}

#[async_trait]
impl JobSource for RedisJobQueue {
    async fn claim_due(&self) -> Result<Option<(JobId, Job)>, QueueError> {
        let mut conn = self.conn().await?;
        let script = Script::new(CLAIM_DUE);
        let claimed: Option<Vec<String>> = script
            .key(self.ready_key())
            .key(self.jobs_key())
            .arg(now_ms())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        let Some(parts) = claimed else {
            return Ok(None);
        };
        let [id, payload] = parts.as_slice() else {
            warn!("claim script returned an incomplete entry, skipping");
            return Ok(None);
        };

        let job: Job = serde_json::from_str(payload)
            .map_err(|e| QueueError::Serialization(e.to_string()))?;
        Ok(Some((JobId::new(id.clone()), job)))
    }

    async fn complete(&self, id: &JobId, job: &Job) -> Result<(), QueueError> {
        let entry = serde_json::json!({
            "jobId": id,
            "taskId": job.task_id,
            "attempt": job.attempt,
        })
        .to_string();
        self.record(&self.completed_key(), &entry, self.config.keep_completed)
            .await
    }

    async fn retry(&self, job: Job, delay: Duration) -> Result<(), QueueError> {
        let id = self.schedule(&job, delay).await?;
        info!(
            job_id = %id,
            task_id = %job.task_id,
            attempt = job.attempt,
            delay_ms = %delay.as_millis(),
            "job scheduled for redelivery"
        );
        Ok(())
    }

    async fn fail(&self, id: &JobId, job: &Job, error: &str) -> Result<(), QueueError> {
        let entry = serde_json::json!({
            "jobId": id,
            "taskId": job.task_id,
            "attempt": job.attempt,
            "error": error,
        })
        .to_string();
        self.record(&self.failed_key(), &entry, self.config.keep_failed)
            .await
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
