//! Per-resource suspension strategies
//!
//! The state machine itself is generic; everything that differs between
//! process definitions, process instances, job definitions and jobs lives in
//! a [`SuspensionStrategy`]: which selectors apply and in what order, how the
//! caller is authorized, what gets logged, and what the cascade looks like.

use crate::request::{SelectorKind, SuspensionRequest};
use bpm_command::{CommandContext, SuspensionSelector, SuspensionTarget};
use bpm_types::operation_log::{entity_type, operation_type};
use bpm_types::{EngineError, EngineResult, SuspensionState};

pub trait SuspensionStrategy: Send + Sync {
    fn target(&self) -> SuspensionTarget;

    /// Selectors this resource can be addressed by, highest precedence first
    fn selector_order(&self) -> &'static [SelectorKind];

    /// Validation message when no usable selector is supplied
    fn missing_selector_message(&self) -> &'static str;

    /// Check the subject may apply `request`, addressed through `selector`
    fn authorize(
        &self,
        ctx: &CommandContext,
        request: &SuspensionRequest,
        selector: &SuspensionSelector,
    ) -> EngineResult<()>;

    fn entity_type(&self) -> &'static str;

    fn operation_type(&self, state: SuspensionState) -> &'static str;

    /// Handler type of the deferred job that applies the change later
    fn handler_type(&self, state: SuspensionState) -> &'static str;

    /// Updates that always accompany the main update
    fn companion_update(
        &self,
        _ctx: &CommandContext,
        _selector: &SuspensionSelector,
        _state: SuspensionState,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Request for the dependent resources, if any
    fn cascade(&self, request: &SuspensionRequest) -> Option<SuspensionRequest>;
}

/// Strategy for `target`
pub fn strategy_for(target: SuspensionTarget) -> &'static dyn SuspensionStrategy {
    match target {
        SuspensionTarget::ProcessDefinition => &ProcessDefinitionStrategy,
        SuspensionTarget::ProcessInstance => &ProcessInstanceStrategy,
        SuspensionTarget::JobDefinition => &JobDefinitionStrategy,
        SuspensionTarget::Job => &JobStrategy,
    }
}

pub struct ProcessDefinitionStrategy;

impl SuspensionStrategy for ProcessDefinitionStrategy {
    fn target(&self) -> SuspensionTarget {
        SuspensionTarget::ProcessDefinition
    }

    fn selector_order(&self) -> &'static [SelectorKind] {
        &[SelectorKind::ResourceId, SelectorKind::ProcessDefinitionKey]
    }

    fn missing_selector_message(&self) -> &'static str {
        "Process definition id nor process definition key cannot be null"
    }

    fn authorize(
        &self,
        ctx: &CommandContext,
        request: &SuspensionRequest,
        selector: &SuspensionSelector,
    ) -> EngineResult<()> {
        let key = match selector {
            SuspensionSelector::ProcessDefinitionKey(key) => key.clone(),
            other => ctx
                .runtime_store()
                .find_process_definition_by_id(other.value())?
                .map(|d| d.key)
                .ok_or_else(|| EngineError::not_found("process definition", other.value()))?,
        };
        let authorization = ctx.authorization_manager();
        authorization.check_update_process_definition(&key)?;
        if request.include_sub_resources {
            authorization.check_update_instances_on_process_definition_by_key(&key)?;
        }
        Ok(())
    }

    fn entity_type(&self) -> &'static str {
        entity_type::PROCESS_DEFINITION
    }

    fn operation_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => operation_type::SUSPEND_PROCESS_DEFINITION,
            SuspensionState::Active => operation_type::ACTIVATE_PROCESS_DEFINITION,
        }
    }

    fn handler_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => "suspend-processdefinition",
            SuspensionState::Active => "activate-processdefinition",
        }
    }

    fn companion_update(
        &self,
        ctx: &CommandContext,
        selector: &SuspensionSelector,
        state: SuspensionState,
    ) -> EngineResult<()> {
        let job_definitions = match selector {
            SuspensionSelector::Id(id) => SuspensionSelector::ProcessDefinitionId(id.clone()),
            other => other.clone(),
        };
        ctx.runtime_store()
            .update_suspension_state(SuspensionTarget::JobDefinition, &job_definitions, state)?;
        Ok(())
    }

    fn cascade(&self, request: &SuspensionRequest) -> Option<SuspensionRequest> {
        if !request.include_sub_resources {
            return None;
        }
        let mut next = SuspensionRequest::new(SuspensionTarget::ProcessInstance, request.state);
        next.selectors.process_definition_id = request.selectors.resource_id.clone();
        next.selectors.process_definition_key = request.selectors.process_definition_key.clone();
        Some(next)
    }
}

pub struct ProcessInstanceStrategy;

impl SuspensionStrategy for ProcessInstanceStrategy {
    fn target(&self) -> SuspensionTarget {
        SuspensionTarget::ProcessInstance
    }

    fn selector_order(&self) -> &'static [SelectorKind] {
        &[
            SelectorKind::ResourceId,
            SelectorKind::ProcessDefinitionId,
            SelectorKind::ProcessDefinitionKey,
        ]
    }

    fn missing_selector_message(&self) -> &'static str {
        "ProcessInstanceId, ProcessDefinitionId nor ProcessDefinitionKey cannot be null."
    }

    fn authorize(
        &self,
        ctx: &CommandContext,
        _request: &SuspensionRequest,
        selector: &SuspensionSelector,
    ) -> EngineResult<()> {
        match selector {
            SuspensionSelector::ProcessDefinitionId(id) => {
                ctx.check_update_instances_on_process_definition_by_id(id)
            }
            SuspensionSelector::ProcessDefinitionKey(key) => ctx
                .authorization_manager()
                .check_update_instances_on_process_definition_by_key(key),
            other => ctx.check_update_process_instance_by_id(other.value()),
        }
    }

    fn entity_type(&self) -> &'static str {
        entity_type::PROCESS_INSTANCE
    }

    fn operation_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => operation_type::SUSPEND,
            SuspensionState::Active => operation_type::ACTIVATE,
        }
    }

    fn handler_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => "suspend-processinstance",
            SuspensionState::Active => "activate-processinstance",
        }
    }

    fn cascade(&self, request: &SuspensionRequest) -> Option<SuspensionRequest> {
        if !request.include_sub_resources {
            return None;
        }
        let mut next = SuspensionRequest::new(SuspensionTarget::Job, request.state);
        next.selectors.process_instance_id = request.selectors.resource_id.clone();
        next.selectors.process_definition_id = request.selectors.process_definition_id.clone();
        next.selectors.process_definition_key = request.selectors.process_definition_key.clone();
        Some(next)
    }
}

pub struct JobDefinitionStrategy;

impl SuspensionStrategy for JobDefinitionStrategy {
    fn target(&self) -> SuspensionTarget {
        SuspensionTarget::JobDefinition
    }

    fn selector_order(&self) -> &'static [SelectorKind] {
        &[
            SelectorKind::ResourceId,
            SelectorKind::ProcessDefinitionId,
            SelectorKind::ProcessDefinitionKey,
        ]
    }

    fn missing_selector_message(&self) -> &'static str {
        "Job definition id, process definition id nor process definition key cannot be null"
    }

    fn authorize(
        &self,
        ctx: &CommandContext,
        _request: &SuspensionRequest,
        selector: &SuspensionSelector,
    ) -> EngineResult<()> {
        match selector {
            SuspensionSelector::ProcessDefinitionId(id) => ctx.check_update_process_definition_by_id(id),
            SuspensionSelector::ProcessDefinitionKey(key) => {
                ctx.authorization_manager().check_update_process_definition(key)
            }
            other => {
                let job_definition = ctx
                    .runtime_store()
                    .find_job_definition_by_id(other.value())?
                    .ok_or_else(|| EngineError::not_found("job definition", other.value()))?;
                ctx.authorization_manager()
                    .check_update_process_definition(&job_definition.process_definition_key)
            }
        }
    }

    fn entity_type(&self) -> &'static str {
        entity_type::JOB_DEFINITION
    }

    fn operation_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => operation_type::SUSPEND_JOB_DEFINITION,
            SuspensionState::Active => operation_type::ACTIVATE_JOB_DEFINITION,
        }
    }

    fn handler_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => "suspend-job-definition",
            SuspensionState::Active => "activate-job-definition",
        }
    }

    fn cascade(&self, request: &SuspensionRequest) -> Option<SuspensionRequest> {
        if !request.include_sub_resources {
            return None;
        }
        let mut next = SuspensionRequest::new(SuspensionTarget::Job, request.state);
        next.selectors.job_definition_id = request.selectors.resource_id.clone();
        next.selectors.process_definition_id = request.selectors.process_definition_id.clone();
        next.selectors.process_definition_key = request.selectors.process_definition_key.clone();
        Some(next)
    }
}

pub struct JobStrategy;

impl SuspensionStrategy for JobStrategy {
    fn target(&self) -> SuspensionTarget {
        SuspensionTarget::Job
    }

    fn selector_order(&self) -> &'static [SelectorKind] {
        &[
            SelectorKind::ResourceId,
            SelectorKind::JobDefinitionId,
            SelectorKind::ProcessInstanceId,
            SelectorKind::ProcessDefinitionId,
            SelectorKind::ProcessDefinitionKey,
        ]
    }

    fn missing_selector_message(&self) -> &'static str {
        "Job id, job definition id, process instance id, process definition id nor process definition key cannot be null"
    }

    /// Jobs carry no resource-level check: changing their state is open to any
    /// caller that reaches the command.
    fn authorize(
        &self,
        _ctx: &CommandContext,
        _request: &SuspensionRequest,
        _selector: &SuspensionSelector,
    ) -> EngineResult<()> {
        Ok(())
    }

    fn entity_type(&self) -> &'static str {
        entity_type::JOB
    }

    fn operation_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => operation_type::SUSPEND_JOB,
            SuspensionState::Active => operation_type::ACTIVATE_JOB,
        }
    }

    fn handler_type(&self, state: SuspensionState) -> &'static str {
        match state {
            SuspensionState::Suspended => "suspend-job",
            SuspensionState::Active => "activate-job",
        }
    }

    fn cascade(&self, _request: &SuspensionRequest) -> Option<SuspensionRequest> {
        None
    }
}

/// Every handler type used by deferred suspension changes, with its target and state
pub fn deferred_handler_types() -> Vec<(&'static str, SuspensionTarget, SuspensionState)> {
    let targets = [
        SuspensionTarget::ProcessDefinition,
        SuspensionTarget::ProcessInstance,
        SuspensionTarget::JobDefinition,
        SuspensionTarget::Job,
    ];
    let mut types = Vec::new();
    for target in targets {
        for state in [SuspensionState::Suspended, SuspensionState::Active] {
            types.push((strategy_for(target).handler_type(state), target, state));
        }
    }
    types
}
