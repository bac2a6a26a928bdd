//! Deferred suspension job handlers

use crate::command::{DeferredSuspension, SetSuspensionStateCmd};
use crate::strategy::deferred_handler_types;
use bpm_command::{Command, CommandContext, JobHandler, JobHandlerRegistry, SuspensionTarget};
use bpm_types::{EngineError, EngineResult, SuspensionState};
use std::sync::Arc;

/// Replays a scheduled state change when its job comes due.
#[derive(Debug, Clone)]
pub struct SuspensionJobHandler {
    handler_type: &'static str,
    target: SuspensionTarget,
    state: SuspensionState,
}

impl SuspensionJobHandler {
    /// One handler per target and state
    pub fn all() -> Vec<Arc<dyn JobHandler>> {
        deferred_handler_types()
            .into_iter()
            .map(|(handler_type, target, state)| {
                Arc::new(Self {
                    handler_type,
                    target,
                    state,
                }) as Arc<dyn JobHandler>
            })
            .collect()
    }

    /// Registry holding every suspension handler
    pub fn registry() -> JobHandlerRegistry {
        Self::all()
            .into_iter()
            .fold(JobHandlerRegistry::new(), JobHandlerRegistry::with_handler)
    }

    fn parse(&self, configuration: &str) -> EngineResult<DeferredSuspension> {
        let deferred: DeferredSuspension = serde_json::from_str(configuration)?;
        if deferred.target != self.target || deferred.state != self.state {
            return Err(EngineError::Validation(format!(
                "Job handler '{}' cannot {} a {}",
                self.handler_type,
                deferred.state,
                deferred.target
            )));
        }
        Ok(deferred)
    }
}

impl JobHandler for SuspensionJobHandler {
    fn handler_type(&self) -> &str {
        self.handler_type
    }

    fn execute(&self, configuration: &str, ctx: &CommandContext) -> EngineResult<()> {
        let request = self.parse(configuration)?.into_request();
        SetSuspensionStateCmd::deferred(request).execute(ctx)
    }
}
