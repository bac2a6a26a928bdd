//! Deferred job executor
//!
//! Acquires due jobs from the scheduler and runs each one in its own command.
//! A failed job keeps its place in the scheduler with one retry less. Jobs out
//! of retries are no longer acquired; they stay listed by [`JobExecutor::failed_jobs`]
//! until given new retries or deleted.

use crate::config::JobExecutorConfig;
use bpm_command::{CommandExecutor, DeferredJob, ExecuteDeferredJobCmd};
use bpm_types::EngineResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Outcome of one acquisition cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobExecutionReport {
    pub acquired: usize,
    pub executed: usize,
    pub failed: usize,
    /// Failures that used up the job's last retry
    pub exhausted: usize,
}

pub struct JobExecutor {
    executor: CommandExecutor,
    config: JobExecutorConfig,
    running: Arc<RwLock<bool>>,
}

impl JobExecutor {
    pub fn new(executor: CommandExecutor, config: JobExecutorConfig) -> Self {
        Self {
            executor,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run every job due at `now`, up to the acquisition limit.
    pub fn execute_due_jobs(&self, now: DateTime<Utc>) -> EngineResult<JobExecutionReport> {
        let scheduler = self.executor.services().scheduler.clone();
        let jobs = scheduler.acquire_due_jobs(now, self.config.max_jobs_per_acquisition)?;
        let mut report = JobExecutionReport {
            acquired: jobs.len(),
            ..JobExecutionReport::default()
        };

        for job in jobs {
            let job_id = job.id.clone();
            let handler_type = job.handler_type.clone();
            match self.executor.execute(None, &ExecuteDeferredJobCmd::new(job)) {
                Ok(()) => report.executed += 1,
                Err(err) => {
                    let retries = scheduler.record_failure(&job_id, &err.to_string())?;
                    report.failed += 1;
                    if retries == 0 {
                        report.exhausted += 1;
                        error!(job_id = %job_id, handler_type = %handler_type, error = %err, "Deferred job out of retries");
                    } else {
                        warn!(job_id = %job_id, handler_type = %handler_type, retries, error = %err, "Deferred job failed");
                    }
                }
            }
        }

        if report.acquired > 0 {
            debug!(
                acquired = report.acquired,
                executed = report.executed,
                failed = report.failed,
                exhausted = report.exhausted,
                "Job acquisition cycle finished"
            );
        }
        Ok(report)
    }

    /// Jobs that used up their retries
    pub fn failed_jobs(&self) -> EngineResult<Vec<DeferredJob>> {
        self.executor.services().scheduler.find_failed_jobs()
    }

    /// Make a failed job eligible for acquisition again
    pub fn set_job_retries(&self, job_id: &str, retries: u32) -> EngineResult<()> {
        self.executor.services().scheduler.set_job_retries(job_id, retries)?;
        info!(job_id = %job_id, retries, "Deferred job retries set");
        Ok(())
    }

    /// Start the acquisition loop on the current tokio runtime.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        {
            let mut running = self.running.write().await;
            *running = true;
        }
        info!(
            interval_ms = self.config.acquisition_interval_ms,
            max_jobs = self.config.max_jobs_per_acquisition,
            "Job executor started"
        );

        let executor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(executor.config.acquisition_interval());
            loop {
                ticker.tick().await;

                if !*executor.running.read().await {
                    break;
                }

                // the store locks synchronously
                let cycle = executor.clone();
                match tokio::task::spawn_blocking(move || cycle.execute_due_jobs(Utc::now())).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!(error = %e, "Job acquisition failed"),
                    Err(e) => error!(error = %e, "Job acquisition task did not complete"),
                }
            }
            info!("Job executor stopped");
        })
    }

    /// Ask the loop to exit after its current tick
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
