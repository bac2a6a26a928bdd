//! Suspension state changes
//!
//! ```text
//! REQUESTED ─validate─► VALIDATED ─authorize─► AUTHORIZED ─┬─ no date ─► APPLIED (+ cascade)
//!                                                          └─ date ────► SCHEDULED
//! ```
//!
//! Either terminal branch is followed by one operation log entry, unless the
//! request is a cascade issued by an enclosing change.

use crate::request::{SelectorKind, SuspensionRequest};
use crate::strategy::{strategy_for, SuspensionStrategy};
use bpm_command::{Command, CommandContext, DeferredJob, SuspensionSelector, SuspensionTarget};
use bpm_types::operation_log::PropertyChange;
use bpm_types::{EngineError, EngineResult, SuspensionState, UserOperationLogEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const SUSPENSION_STATE_PROPERTY: &str = "suspensionState";

/// Where a state change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A caller asked for it
    Request,
    /// A deferred job fired; a vanished target is skipped
    DeferredJob,
}

/// Handler configuration stored on a deferred state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredSuspension {
    pub target: SuspensionTarget,
    pub state: SuspensionState,
    pub selectors: crate::request::Selectors,
    pub include_sub_resources: bool,
}

impl DeferredSuspension {
    pub fn from_request(request: &SuspensionRequest) -> Self {
        Self {
            target: request.target,
            state: request.state,
            selectors: request.selectors.clone(),
            include_sub_resources: request.include_sub_resources,
        }
    }

    /// The request to replay when the job fires
    pub fn into_request(self) -> SuspensionRequest {
        let mut request = SuspensionRequest::new(self.target, self.state);
        request.selectors = self.selectors;
        request.include_sub_resources = self.include_sub_resources;
        request
    }
}

/// Activate or suspend resources.
#[derive(Debug, Clone)]
pub struct SetSuspensionStateCmd {
    request: SuspensionRequest,
    origin: Origin,
}

impl SetSuspensionStateCmd {
    pub fn new(request: SuspensionRequest) -> Self {
        Self {
            request,
            origin: Origin::Request,
        }
    }

    pub(crate) fn deferred(request: SuspensionRequest) -> Self {
        Self {
            request,
            origin: Origin::DeferredJob,
        }
    }

    pub fn request(&self) -> &SuspensionRequest {
        &self.request
    }
}

impl Command<()> for SetSuspensionStateCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        match apply(ctx, &self.request, self.origin) {
            Err(err) if self.origin == Origin::DeferredJob && err.is_not_found() => {
                warn!(
                    target_kind = %self.request.target,
                    error = %err,
                    "Deferred suspension state change skipped, target no longer exists"
                );
                Ok(())
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "SetSuspensionStateCmd"
    }
}

/// Run the state machine for `request`.
pub fn apply(ctx: &CommandContext, request: &SuspensionRequest, origin: Origin) -> EngineResult<()> {
    let request = &request.clone().normalized();
    let strategy = strategy_for(request.target);

    let selector = validate(strategy, request)?;
    strategy.authorize(ctx, request, &selector)?;

    let org_state = match request.execution_date {
        None => Some(update(ctx, strategy, request, &selector, origin)?),
        Some(due_date) => {
            schedule(ctx, strategy, request, due_date)?;
            None
        }
    };

    if request.log_user_operation {
        log_user_operation(ctx, strategy, request, org_state.flatten())?;
    }
    Ok(())
}

/// Pick the highest-precedence selector, rejecting selectors the target does not know.
fn validate(
    strategy: &dyn SuspensionStrategy,
    request: &SuspensionRequest,
) -> EngineResult<SuspensionSelector> {
    let order = strategy.selector_order();
    if let Some(unsupported) = request
        .selectors
        .supplied()
        .into_iter()
        .find(|kind| !order.contains(kind))
    {
        return Err(EngineError::Validation(format!(
            "Cannot select {} by {}",
            strategy.target(),
            unsupported
        )));
    }

    order
        .iter()
        .find_map(|kind| request.selectors.to_storage(*kind))
        .ok_or_else(|| EngineError::Validation(strategy.missing_selector_message().to_string()))
}

/// Apply the change now; returns the previous state when a single resource was addressed.
fn update(
    ctx: &CommandContext,
    strategy: &dyn SuspensionStrategy,
    request: &SuspensionRequest,
    selector: &SuspensionSelector,
    origin: Origin,
) -> EngineResult<Option<SuspensionState>> {
    let store = ctx.runtime_store();

    let org_state = match selector {
        SuspensionSelector::Id(id) => Some(
            store
                .suspension_state(request.target, id)?
                .ok_or_else(|| EngineError::not_found(request.target.name(), id.as_str()))?,
        ),
        _ => None,
    };

    let updated = store.update_suspension_state(request.target, selector, request.state)?;
    strategy.companion_update(ctx, selector, request.state)?;
    info!(
        target_kind = %request.target,
        state = %request.state,
        selector = ?selector,
        updated,
        "Suspension state changed"
    );

    if let Some(next) = strategy.cascade(request) {
        let nested = SetSuspensionStateCmd {
            request: next.without_user_operation_log(),
            origin,
        };
        nested.execute(ctx)?;
    }

    Ok(org_state)
}

fn schedule(
    ctx: &CommandContext,
    strategy: &dyn SuspensionStrategy,
    request: &SuspensionRequest,
    due_date: DateTime<Utc>,
) -> EngineResult<()> {
    let configuration = serde_json::to_string(&DeferredSuspension::from_request(request))?;
    let job = DeferredJob::new(due_date, strategy.handler_type(request.state), configuration);
    info!(
        job_id = %job.id,
        handler_type = %job.handler_type,
        due_date = %due_date,
        "Suspension state change scheduled"
    );
    ctx.scheduler().schedule(job)
}

fn log_user_operation(
    ctx: &CommandContext,
    strategy: &dyn SuspensionStrategy,
    request: &SuspensionRequest,
    org_state: Option<SuspensionState>,
) -> EngineResult<()> {
    let selectors = &request.selectors;
    let mut entry = UserOperationLogEntry::new(
        strategy.operation_type(request.state),
        strategy.entity_type(),
    )
    .with_property_change(PropertyChange::new(
        SUSPENSION_STATE_PROPERTY,
        org_state.map(|s| s.name().to_string()),
        Some(request.state.name().to_string()),
    ));

    entry.job_definition_id = selectors.job_definition_id.clone();
    entry.process_instance_id = selectors.process_instance_id.clone();
    entry.process_definition_id = selectors.process_definition_id.clone();
    entry.process_definition_key = selectors.process_definition_key.clone();

    if let Some(id) = selectors.get(SelectorKind::ResourceId) {
        let id = Some(id.to_string());
        match request.target {
            SuspensionTarget::Job => entry.job_id = id,
            SuspensionTarget::JobDefinition => entry.job_definition_id = id,
            SuspensionTarget::ProcessInstance => entry.process_instance_id = id,
            SuspensionTarget::ProcessDefinition => entry.process_definition_id = id,
        }
    }

    ctx.log_user_operation(entry)
}
