use std::time::Duration;

/// Configuration for the Redis-backed queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// Queue name; all Redis keys are prefixed with it.
    pub queue_name: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// How many finished jobs to retain for inspection.
    pub keep_completed: usize,
    /// How many exhausted jobs to retain for inspection.
    pub keep_failed: usize,
}

impl QueueConfig {
    /// Queue config with platform defaults for everything but the URL.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            queue_name: "copydesk-writer".to_owned(),
            pool_size: 4,
            keep_completed: 100,
            keep_failed: 50,
        }
    }

    /// Override the queue name.
    #[must_use]
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }
}

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of this service; jobs re-enter through the public run
    /// endpoint so queued and direct processing behave identically.
    pub self_base_url: String,
    /// Maximum jobs processed simultaneously.
    pub concurrency: usize,
    /// Maximum job starts per rolling window.
    pub rate_limit_max: usize,
    /// Length of the rolling rate-limit window.
    pub rate_limit_window: Duration,
    /// Deadline for one run call; generation latency dominates.
    pub run_timeout: Duration,
    /// Idle sleep between polls when no job is due.
    pub poll_interval: Duration,
    /// Total delivery attempts per job before it is parked as failed.
    pub max_attempts: u32,
    /// Base delay for exponential redelivery backoff.
    pub backoff_base: Duration,
}

impl WorkerConfig {
    /// Worker config with platform defaults for everything but the URL.
    pub fn new(self_base_url: impl Into<String>) -> Self {
        Self {
            self_base_url: self_base_url.into(),
            concurrency: 2,
            rate_limit_max: 5,
            rate_limit_window: Duration::from_secs(60),
            run_timeout: Duration::from_secs(90),
            poll_interval: Duration::from_millis(500),
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
        }
    }

    /// Exponential redelivery delay after the given zero-based failed
    /// attempt: `backoff_base * 2^attempt`.
    pub fn redelivery_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.min(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_defaults() {
        let cfg = QueueConfig::new("redis://localhost:6379");
        assert_eq!(cfg.queue_name, "copydesk-writer");
        assert_eq!(cfg.keep_completed, 100);
        assert_eq!(cfg.keep_failed, 50);
    }

    #[test]
    fn worker_defaults() {
        let cfg = WorkerConfig::new("http://localhost:8080");
        assert_eq!(cfg.concurrency, 2);
        assert_eq!(cfg.rate_limit_max, 5);
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(60));
        assert_eq!(cfg.max_attempts, 3);
    }

    #[test]
    fn redelivery_backoff_doubles() {
        let cfg = WorkerConfig::new("http://localhost:8080");
        assert_eq!(cfg.redelivery_delay(0), Duration::from_secs(5));
        assert_eq!(cfg.redelivery_delay(1), Duration::from_secs(10));
        assert_eq!(cfg.redelivery_delay(2), Duration::from_secs(20));
    }
}
