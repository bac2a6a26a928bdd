//! Fluent suspension state changes

use super::ServiceContext;
use bpm_suspension::{SetSuspensionStateCmd, SuspensionRequest, SuspensionTarget};
use bpm_types::{EngineResult, SuspensionState};
use chrono::{DateTime, Utc};

/// Selects resources of one kind and suspends or activates them.
///
/// ```rust,ignore
/// engine
///     .management_service(Some(&user))
///     .update_job_suspension_state()
///     .by_process_definition_key("invoice")
///     .suspend()?;
/// ```
#[derive(Debug, Clone)]
pub struct UpdateSuspensionStateBuilder<'a> {
    ctx: ServiceContext<'a>,
    request: SuspensionRequest,
}

impl<'a> UpdateSuspensionStateBuilder<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>, target: SuspensionTarget) -> Self {
        Self {
            ctx,
            request: SuspensionRequest::activate(target),
        }
    }

    pub fn by_id(mut self, id: impl Into<String>) -> Self {
        self.request = self.request.by_id(id);
        self
    }

    pub fn by_job_definition_id(mut self, id: impl Into<String>) -> Self {
        self.request = self.request.by_job_definition_id(id);
        self
    }

    pub fn by_process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.request = self.request.by_process_instance_id(id);
        self
    }

    pub fn by_process_definition_id(mut self, id: impl Into<String>) -> Self {
        self.request = self.request.by_process_definition_id(id);
        self
    }

    pub fn by_process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.request = self.request.by_process_definition_key(key);
        self
    }

    /// Also change dependent resources (instances of a definition, jobs of a job definition)
    pub fn include_sub_resources(mut self, include: bool) -> Self {
        self.request = self.request.include_sub_resources(include);
        self
    }

    /// Apply the change at `date` instead of now
    pub fn execution_date(mut self, date: DateTime<Utc>) -> Self {
        self.request = self.request.execution_date(date);
        self
    }

    pub fn suspend(self) -> EngineResult<()> {
        self.apply(SuspensionState::Suspended)
    }

    pub fn activate(self) -> EngineResult<()> {
        self.apply(SuspensionState::Active)
    }

    fn apply(mut self, state: SuspensionState) -> EngineResult<()> {
        self.request.state = state;
        self.ctx.execute(&SetSuspensionStateCmd::new(self.request))
    }
}
