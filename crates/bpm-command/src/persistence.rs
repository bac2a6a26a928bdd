//! Runtime storage gateway and unit of work
//!
//! Commands never touch storage directly; they go through [`RuntimeStore`] for
//! runtime data and run inside a [`UnitOfWork`] that is committed when the
//! command returns `Ok` and rolled back otherwise.

use crate::query::{ExecutionQuery, JobQuery, ProcessInstanceQuery, TaskQuery};
use bpm_types::{
    EngineResult, EventSubscription, EventType, Execution, Job, JobDefinition, ProcessDefinition,
    SuspensionState, Task,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runs work atomically.
pub trait UnitOfWork: Send + Sync {
    /// Run `work`; if it fails, every change it made is discarded and the error returned.
    fn run(&self, work: &mut dyn FnMut() -> EngineResult<()>) -> EngineResult<()>;
}

/// Resource kinds that carry a [`SuspensionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuspensionTarget {
    ProcessDefinition,
    ProcessInstance,
    JobDefinition,
    Job,
}

impl SuspensionTarget {
    pub fn name(&self) -> &'static str {
        match self {
            SuspensionTarget::ProcessDefinition => "process definition",
            SuspensionTarget::ProcessInstance => "process instance",
            SuspensionTarget::JobDefinition => "job definition",
            SuspensionTarget::Job => "job",
        }
    }
}

impl fmt::Display for SuspensionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rows of a [`SuspensionTarget`] a state update applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum SuspensionSelector {
    /// The resource itself
    Id(String),
    JobDefinitionId(String),
    ProcessInstanceId(String),
    ProcessDefinitionId(String),
    ProcessDefinitionKey(String),
}

impl SuspensionSelector {
    pub fn value(&self) -> &str {
        match self {
            SuspensionSelector::Id(v)
            | SuspensionSelector::JobDefinitionId(v)
            | SuspensionSelector::ProcessInstanceId(v)
            | SuspensionSelector::ProcessDefinitionId(v)
            | SuspensionSelector::ProcessDefinitionKey(v) => v,
        }
    }
}

/// Storage of process runtime data.
pub trait RuntimeStore: Send + Sync {
    fn find_process_definition_by_id(&self, id: &str) -> EngineResult<Option<ProcessDefinition>>;

    /// Highest version deployed under `key`
    fn find_latest_process_definition_by_key(
        &self,
        key: &str,
    ) -> EngineResult<Option<ProcessDefinition>>;

    fn find_execution_by_id(&self, id: &str) -> EngineResult<Option<Execution>>;

    fn select_executions(&self, query: &ExecutionQuery) -> EngineResult<Vec<Execution>>;

    fn select_process_instances(&self, query: &ProcessInstanceQuery) -> EngineResult<Vec<Execution>>;

    fn find_job_by_id(&self, id: &str) -> EngineResult<Option<Job>>;

    fn find_job_definition_by_id(&self, id: &str) -> EngineResult<Option<JobDefinition>>;

    fn select_jobs(&self, query: &JobQuery) -> EngineResult<Vec<Job>>;

    fn find_task_by_id(&self, id: &str) -> EngineResult<Option<Task>>;

    fn update_task(&self, task: Task) -> EngineResult<()>;

    fn select_tasks(&self, query: &TaskQuery) -> EngineResult<Vec<Task>>;

    /// The start-event subscription for message `name`, if one is deployed
    fn find_message_start_subscription_by_name(
        &self,
        name: &str,
    ) -> EngineResult<Option<EventSubscription>>;

    /// Subscriptions of `execution_id` of the given type, optionally filtered by event name
    fn find_event_subscriptions_by_execution(
        &self,
        execution_id: &str,
        event_type: EventType,
        event_name: Option<&str>,
    ) -> EngineResult<Vec<EventSubscription>>;

    /// Current state of one resource; `None` if it does not exist
    fn suspension_state(
        &self,
        target: SuspensionTarget,
        id: &str,
    ) -> EngineResult<Option<SuspensionState>>;

    /// Set `state` on every row of `target` matched by `selector`, returning the count.
    ///
    /// Updating process instances also updates their tasks.
    fn update_suspension_state(
        &self,
        target: SuspensionTarget,
        selector: &SuspensionSelector,
        state: SuspensionState,
    ) -> EngineResult<usize>;
}

