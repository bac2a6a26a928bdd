//! Repository service: process definition suspension

use super::suspension::UpdateSuspensionStateBuilder;
use super::ServiceContext;
use bpm_suspension::SuspensionTarget;
use bpm_types::EngineResult;
use chrono::{DateTime, Utc};

pub struct RepositoryService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> RepositoryService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn update_process_definition_suspension_state(&self) -> UpdateSuspensionStateBuilder<'a> {
        UpdateSuspensionStateBuilder::new(self.ctx.clone(), SuspensionTarget::ProcessDefinition)
    }

    /// Suspend a definition, optionally with its instances, now or at `execution_date`
    pub fn suspend_process_definition_by_id(
        &self,
        process_definition_id: impl Into<String>,
        include_process_instances: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.by_id(process_definition_id, include_process_instances, execution_date)
            .suspend()
    }

    pub fn activate_process_definition_by_id(
        &self,
        process_definition_id: impl Into<String>,
        include_process_instances: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.by_id(process_definition_id, include_process_instances, execution_date)
            .activate()
    }

    /// Suspend every version deployed under `key`
    pub fn suspend_process_definition_by_key(
        &self,
        key: impl Into<String>,
        include_process_instances: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.by_key(key, include_process_instances, execution_date).suspend()
    }

    pub fn activate_process_definition_by_key(
        &self,
        key: impl Into<String>,
        include_process_instances: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> EngineResult<()> {
        self.by_key(key, include_process_instances, execution_date).activate()
    }

    fn by_id(
        &self,
        id: impl Into<String>,
        include: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> UpdateSuspensionStateBuilder<'a> {
        with_date(
            self.update_process_definition_suspension_state()
                .by_id(id)
                .include_sub_resources(include),
            execution_date,
        )
    }

    fn by_key(
        &self,
        key: impl Into<String>,
        include: bool,
        execution_date: Option<DateTime<Utc>>,
    ) -> UpdateSuspensionStateBuilder<'a> {
        with_date(
            self.update_process_definition_suspension_state()
                .by_process_definition_key(key)
                .include_sub_resources(include),
            execution_date,
        )
    }
}

pub(crate) fn with_date(
    builder: UpdateSuspensionStateBuilder<'_>,
    execution_date: Option<DateTime<Utc>>,
) -> UpdateSuspensionStateBuilder<'_> {
    match execution_date {
        Some(date) => builder.execution_date(date),
        None => builder,
    }
}
