//! Deferred jobs and their handlers
//!
//! A [`DeferredJob`] is created when a state change is requested for a future
//! date. The scheduler owns it from then on; when it comes due, the job
//! executor looks up the [`JobHandler`] registered for its handler type and
//! runs it in a fresh command, without authentication.

use crate::command::Command;
use crate::context::CommandContext;
use bpm_types::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_RETRIES: u32 = 3;

/// Work scheduled for a due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredJob {
    pub id: String,
    pub due_date: DateTime<Utc>,
    pub handler_type: String,
    pub handler_configuration: String,
    pub retries: u32,
    pub exception_message: Option<String>,
}

impl DeferredJob {
    pub fn new(
        due_date: DateTime<Utc>,
        handler_type: impl Into<String>,
        handler_configuration: impl Into<String>,
    ) -> Self {
        Self {
            id: bpm_types::new_id(),
            due_date,
            handler_type: handler_type.into(),
            handler_configuration: handler_configuration.into(),
            retries: DEFAULT_RETRIES,
            exception_message: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }

    pub fn is_failed(&self) -> bool {
        self.retries == 0
    }
}

/// Schedule-deferred-work capability
pub trait JobScheduler: Send + Sync {
    fn schedule(&self, job: DeferredJob) -> EngineResult<()>;

    /// Due jobs with retries left, oldest due date first
    fn acquire_due_jobs(&self, now: DateTime<Utc>, max_jobs: usize) -> EngineResult<Vec<DeferredJob>>;

    /// Remove a job after it ran
    fn delete_job(&self, job_id: &str) -> EngineResult<()>;

    /// Record a failed run, consuming one retry; returns the retries left
    fn record_failure(&self, job_id: &str, message: &str) -> EngineResult<u32>;

    fn find_jobs_by_handler_type(&self, handler_type: &str) -> EngineResult<Vec<DeferredJob>>;

    /// Jobs out of retries; they stay until retried or deleted
    fn find_failed_jobs(&self) -> EngineResult<Vec<DeferredJob>>;

    /// Give a failed job `retries` more attempts
    fn set_job_retries(&self, job_id: &str, retries: u32) -> EngineResult<()>;
}

/// Executes deferred jobs of one handler type.
pub trait JobHandler: Send + Sync {
    fn handler_type(&self) -> &str;

    fn execute(&self, configuration: &str, ctx: &CommandContext) -> EngineResult<()>;
}

/// Job handlers by handler type
#[derive(Clone, Default)]
pub struct JobHandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers
            .insert(handler.handler_type().to_string(), handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, handler_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(handler_type).cloned()
    }

    pub fn handler_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for JobHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandlerRegistry")
            .field("handler_types", &self.handler_types())
            .finish()
    }
}

/// Run one deferred job and remove it from the scheduler.
pub struct ExecuteDeferredJobCmd {
    job: DeferredJob,
}

impl ExecuteDeferredJobCmd {
    pub fn new(job: DeferredJob) -> Self {
        Self { job }
    }
}

impl Command<()> for ExecuteDeferredJobCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        let handler = ctx.job_handlers().get(&self.job.handler_type).ok_or_else(|| {
            EngineError::not_found_with(
                "job handler",
                self.job.handler_type.clone(),
                format!("No job handler registered for type '{}'", self.job.handler_type),
            )
        })?;

        debug!(job_id = %self.job.id, handler_type = %self.job.handler_type, "Executing deferred job");
        ctx.run_without_authentication(|| handler.execute(&self.job.handler_configuration, ctx))?;
        ctx.scheduler().delete_job(&self.job.id)
    }

    fn name(&self) -> &'static str {
        "ExecuteDeferredJobCmd"
    }
}
