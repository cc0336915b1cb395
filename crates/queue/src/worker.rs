use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use copydesk_auth::TokenAuthority;
use copydesk_client::{RequestOptions, ResilientClient};
use copydesk_core::{Job, JobId};

use crate::config::WorkerConfig;
use crate::source::JobSource;

/// Consumes jobs and drives each task through a generation run.
///
/// Processing re-enters the service through the public run endpoint rather
/// than calling the pipeline directly, so a queued task behaves exactly
/// like one run synchronously. A semaphore bounds concurrent runs and a
/// rolling window caps job starts, keeping load on the generation hub
/// predictable.
pub struct TaskWorker {
    source: Arc<dyn JobSource>,
    client: ResilientClient,
    authority: Arc<TokenAuthority>,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
}

impl TaskWorker {
    #[must_use]
    pub fn new(
        source: Arc<dyn JobSource>,
        client: ResilientClient,
        authority: Arc<TokenAuthority>,
        config: WorkerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Self {
            source,
            client,
            authority,
            config,
            semaphore,
        }
    }

    /// Consume jobs until the token is cancelled, then wait for in-flight
    /// jobs to finish.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            concurrency = self.config.concurrency,
            rate_limit_max = self.config.rate_limit_max,
            "worker started"
        );

        let tracker = TaskTracker::new();
        let mut window = RateWindow::new(self.config.rate_limit_max, self.config.rate_limit_window);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Some(wait) = window.delay_until_admit(Instant::now()) {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(wait) => {}
                }
                continue;
            }

            let claimed = match self.source.claim_due().await {
                Ok(claimed) => claimed,
                Err(e) => {
                    warn!(error = %e, "failed to claim job");
                    None
                }
            };

            let Some((id, job)) = claimed else {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                }
                continue;
            };

            window.admit(Instant::now());

            // Acquire before spawning so claiming pauses while the pool is
            // saturated, instead of piling claimed jobs into memory.
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let worker = Arc::clone(&self);
            tracker.spawn(async move {
                worker.process(id, job).await;
                drop(permit);
            });
        }

        tracker.close();
        tracker.wait().await;
        info!("worker stopped");
    }

    /// Drive one job through the run endpoint.
    async fn process(&self, id: JobId, job: Job) {
        info!(job_id = %id, task_id = %job.task_id, attempt = job.attempt, "processing job");

        match self.invoke_run(&job).await {
            Ok(status) => {
                info!(job_id = %id, task_id = %job.task_id, status = %status, "job completed");
                if let Err(e) = self.source.complete(&id, &job).await {
                    warn!(job_id = %id, error = %e, "failed to record completed job");
                }
            }
            Err(reason) => {
                let next = job.next_attempt();
                if next.attempt < self.config.max_attempts {
                    let delay = self.config.redelivery_delay(job.attempt);
                    warn!(
                        job_id = %id,
                        task_id = %job.task_id,
                        attempt = job.attempt,
                        delay_ms = %delay.as_millis(),
                        error = %reason,
                        "job failed, scheduling redelivery"
                    );
                    if let Err(e) = self.source.retry(next, delay).await {
                        error!(job_id = %id, error = %e, "failed to schedule redelivery");
                    }
                } else {
                    // The task keeps whatever status the last attempt left;
                    // it is never silently marked done.
                    error!(
                        job_id = %id,
                        task_id = %job.task_id,
                        attempt = job.attempt,
                        error = %reason,
                        "job failed, attempts exhausted"
                    );
                    if let Err(e) = self.source.fail(&id, &job, &reason).await {
                        warn!(job_id = %id, error = %e, "failed to record failed job");
                    }
                }
            }
        }
    }

    /// POST the run request through the same API path a direct caller uses.
    async fn invoke_run(&self, job: &Job) -> Result<String, String> {
        let token = self
            .authority
            .issue_internal("writer")
            .map_err(|e| e.to_string())?;
        let headers = HashMap::from([("Authorization".to_owned(), format!("Bearer {token}"))]);

        let url = format!("{}/v1/write/run", self.config.self_base_url);
        let body = serde_json::json!({ "taskId": job.task_id });
        let opts = RequestOptions::default().with_timeout(self.config.run_timeout);

        let response = self
            .client
            .post_json(&url, &body, &headers, Some(&opts))
            .await
            .map_err(|e| e.to_string())?;

        // The run endpoint answers with the task fields at the top level.
        Ok(response
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_owned())
    }
}

/// Rolling-window admission counter: at most `max` admissions per `window`.
struct RateWindow {
    max: usize,
    window: Duration,
    admissions: VecDeque<Instant>,
}

impl RateWindow {
    fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            admissions: VecDeque::new(),
        }
    }

    /// `None` when an admission is allowed now; otherwise how long to wait
    /// until the oldest admission leaves the window.
    fn delay_until_admit(&mut self, now: Instant) -> Option<Duration> {
        while let Some(&oldest) = self.admissions.front() {
            if now.duration_since(oldest) >= self.window {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
        if self.admissions.len() < self.max {
            None
        } else {
            let oldest = *self.admissions.front()?;
            Some(self.window.saturating_sub(now.duration_since(oldest)))
        }
    }

    fn admit(&mut self, now: Instant) {
        self.admissions.push_back(now);
    }
}
