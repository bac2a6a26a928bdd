//! Suspension requests

use bpm_command::{SuspensionSelector, SuspensionTarget};
use bpm_types::SuspensionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of selector a request can carry, in the order they are considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    ResourceId,
    JobDefinitionId,
    ProcessInstanceId,
    ProcessDefinitionId,
    ProcessDefinitionKey,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectorKind::ResourceId => "resource id",
            SelectorKind::JobDefinitionId => "job definition id",
            SelectorKind::ProcessInstanceId => "process instance id",
            SelectorKind::ProcessDefinitionId => "process definition id",
            SelectorKind::ProcessDefinitionKey => "process definition key",
        };
        f.write_str(name)
    }
}

/// Every way a request can address resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_definition_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_definition_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_definition_key: Option<String>,
}

impl Selectors {
    pub fn get(&self, kind: SelectorKind) -> Option<&str> {
        match kind {
            SelectorKind::ResourceId => self.resource_id.as_deref(),
            SelectorKind::JobDefinitionId => self.job_definition_id.as_deref(),
            SelectorKind::ProcessInstanceId => self.process_instance_id.as_deref(),
            SelectorKind::ProcessDefinitionId => self.process_definition_id.as_deref(),
            SelectorKind::ProcessDefinitionKey => self.process_definition_key.as_deref(),
        }
    }

    /// Kinds with a value, in precedence order
    pub fn supplied(&self) -> Vec<SelectorKind> {
        [
            SelectorKind::ResourceId,
            SelectorKind::JobDefinitionId,
            SelectorKind::ProcessInstanceId,
            SelectorKind::ProcessDefinitionId,
            SelectorKind::ProcessDefinitionKey,
        ]
        .into_iter()
        .filter(|k| self.get(*k).is_some())
        .collect()
    }

    /// The storage selector for `kind`, if a value was supplied
    pub fn to_storage(&self, kind: SelectorKind) -> Option<SuspensionSelector> {
        let value = self.get(kind)?.to_string();
        Some(match kind {
            SelectorKind::ResourceId => SuspensionSelector::Id(value),
            SelectorKind::JobDefinitionId => SuspensionSelector::JobDefinitionId(value),
            SelectorKind::ProcessInstanceId => SuspensionSelector::ProcessInstanceId(value),
            SelectorKind::ProcessDefinitionId => SuspensionSelector::ProcessDefinitionId(value),
            SelectorKind::ProcessDefinitionKey => SuspensionSelector::ProcessDefinitionKey(value),
        })
    }
}

/// A request to move resources to `state`, now or at `execution_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspensionRequest {
    pub target: SuspensionTarget,
    pub state: SuspensionState,
    pub selectors: Selectors,
    /// Also change the dependent resources (instances of a definition, jobs of
    /// an instance or job definition)
    pub include_sub_resources: bool,
    pub execution_date: Option<DateTime<Utc>>,
    pub(crate) log_user_operation: bool,
}

impl SuspensionRequest {
    pub fn new(target: SuspensionTarget, state: SuspensionState) -> Self {
        Self {
            target,
            state,
            selectors: Selectors::default(),
            // an instance always takes its jobs along
            include_sub_resources: target == SuspensionTarget::ProcessInstance,
            execution_date: None,
            log_user_operation: true,
        }
    }

    pub fn suspend(target: SuspensionTarget) -> Self {
        Self::new(target, SuspensionState::Suspended)
    }

    pub fn activate(target: SuspensionTarget) -> Self {
        Self::new(target, SuspensionState::Active)
    }

    /// Id of the resource itself (job id, job definition id, process instance id,
    /// process definition id)
    pub fn by_id(mut self, id: impl Into<String>) -> Self {
        self.selectors.resource_id = Some(id.into());
        self
    }

    pub fn by_job_definition_id(mut self, id: impl Into<String>) -> Self {
        self.selectors.job_definition_id = Some(id.into());
        self
    }

    pub fn by_process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.selectors.process_instance_id = Some(id.into());
        self
    }

    pub fn by_process_definition_id(mut self, id: impl Into<String>) -> Self {
        self.selectors.process_definition_id = Some(id.into());
        self
    }

    pub fn by_process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.selectors.process_definition_key = Some(key.into());
        self
    }

    pub fn include_sub_resources(mut self, include: bool) -> Self {
        self.include_sub_resources = include;
        self
    }

    pub fn execution_date(mut self, date: DateTime<Utc>) -> Self {
        self.execution_date = Some(date);
        self
    }

    pub fn logs_user_operation(&self) -> bool {
        self.log_user_operation
    }

    /// Fold the selector naming the target itself into `resource_id`, so a
    /// process instance addressed by process instance id (or a job definition
    /// by job definition id) is handled like one addressed by id.
    pub(crate) fn normalized(mut self) -> Self {
        let own_id = match self.target {
            SuspensionTarget::ProcessInstance => self.selectors.process_instance_id.take(),
            SuspensionTarget::JobDefinition => self.selectors.job_definition_id.take(),
            _ => return self,
        };
        if self.selectors.resource_id.is_none() {
            self.selectors.resource_id = own_id;
        }
        self
    }

    /// Same request without an audit entry, as used for cascades
    pub(crate) fn without_user_operation_log(mut self) -> Self {
        self.log_user_operation = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplied_in_precedence_order() {
        let request = SuspensionRequest::suspend(SuspensionTarget::Job)
            .by_process_definition_key("invoice")
            .by_job_definition_id("jd-1");
        assert_eq!(
            request.selectors.supplied(),
            vec![SelectorKind::JobDefinitionId, SelectorKind::ProcessDefinitionKey]
        );
        assert_eq!(
            request.selectors.to_storage(SelectorKind::JobDefinitionId),
            Some(SuspensionSelector::JobDefinitionId("jd-1".into()))
        );
        assert_eq!(request.selectors.to_storage(SelectorKind::ResourceId), None);
    }

    #[test]
    fn test_own_id_selector_becomes_resource_id() {
        let instance = SuspensionRequest::suspend(SuspensionTarget::ProcessInstance)
            .by_process_instance_id("pi-1")
            .normalized();
        assert_eq!(instance.selectors.resource_id.as_deref(), Some("pi-1"));
        assert_eq!(instance.selectors.process_instance_id, None);

        let job_definition = SuspensionRequest::activate(SuspensionTarget::JobDefinition)
            .by_id("jd-1")
            .by_job_definition_id("jd-2")
            .normalized();
        assert_eq!(job_definition.selectors.resource_id.as_deref(), Some("jd-1"));
        assert_eq!(job_definition.selectors.supplied(), vec![SelectorKind::ResourceId]);

        let job = SuspensionRequest::suspend(SuspensionTarget::Job)
            .by_process_instance_id("pi-1")
            .normalized();
        assert_eq!(job.selectors.supplied(), vec![SelectorKind::ProcessInstanceId]);
    }

    #[test]
    fn test_selector_kind_display() {
        assert_eq!(SelectorKind::ProcessDefinitionKey.to_string(), "process definition key");
    }

    #[test]
    fn test_instances_cascade_by_default() {
        assert!(SuspensionRequest::suspend(SuspensionTarget::ProcessInstance).include_sub_resources);
        assert!(!SuspensionRequest::suspend(SuspensionTarget::ProcessDefinition).include_sub_resources);
        assert!(SuspensionRequest::activate(SuspensionTarget::Job).logs_user_operation());
    }
}
