//! Management service: jobs and job definitions

use super::repository::with_date;
use super::suspension::UpdateSuspensionStateBuilder;
use super::ServiceContext;
use bpm_authz::query_param;
use bpm_command::{Command, CommandContext, JobQuery};
use bpm_suspension::SuspensionTarget;
use bpm_types::{EngineResult, Job, Permission, Resource};
use chrono::{DateTime, Utc};

/// Jobs visible to the subject.
///
/// A job is visible with READ on its process instance or READ_INSTANCES on
/// its definition key.
#[derive(Debug, Clone, Default)]
pub struct JobQueryCmd {
    query: JobQuery,
}

impl JobQueryCmd {
    pub fn new(query: JobQuery) -> Self {
        Self { query }
    }
}

impl Command<Vec<Job>> for JobQueryCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Vec<Job>> {
        let mut query = self.query.clone();
        let authorization = ctx.authorization_manager();
        authorization.configure_query_with(
            &mut query,
            Resource::ProcessInstance,
            query_param::RES_PROC_INST_ID,
            Permission::Read,
        );
        authorization.add_permission_check(
            &mut query,
            Permission::ReadInstances,
            Resource::ProcessDefinition,
            query_param::PROC_DEF_KEY,
        );
        ctx.runtime_store().select_jobs(&query)
    }

    fn name(&self) -> &'static str {
        "JobQueryCmd"
    }
}

pub struct ManagementService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> ManagementService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn update_job_definition_suspension_state(&self) -> UpdateSuspensionStateBuilder<'a> {
        UpdateSuspensionStateBuilder::new(self.ctx.clone(), SuspensionTarget::JobDefinition)
    }

    pub fn update_job_suspension_state(&self) -> UpdateSuspensionStateBuilder<'a> {
        UpdateSuspensionStateBuilder::new(self.ctx.clone(), SuspensionTarget::Job)
    }

    /// Suspend a job definition, optionally with its jobs, now or at `execution_date`
    pub fn suspend_job_definition_by_id(
        &self,
        job_definition_id: impl Into<String>,
        include_jobs: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        with_date(
            self.update_job_definition_suspension_state()
                .by_id(job_definition_id)
                .include_sub_resources(include_jobs),
            execution_date,
        )
        .suspend()
    }

    pub fn activate_job_definition_by_id(
        &self,
        job_definition_id: impl Into<String>,
        include_jobs: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        with_date(
            self.update_job_definition_suspension_state()
                .by_id(job_definition_id)
                .include_sub_resources(include_jobs),
            execution_date,
        )
        .activate()
    }

    pub fn suspend_job_by_id(&self, job_id: impl Into<String>) -> EngineResult<()> {
        self.update_job_suspension_state().by_id(job_id).suspend()
    }

    pub fn activate_job_by_id(&self, job_id: impl Into<String>) -> EngineResult<()> {
        self.update_job_suspension_state().by_id(job_id).activate()
    }

    pub fn jobs(&self, query: JobQuery) -> EngineResult<Vec<Job>> {
        self.ctx.execute(&JobQueryCmd::new(query))
    }
}
