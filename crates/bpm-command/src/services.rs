//! Collaborators shared by every command

use crate::job::{JobHandlerRegistry, JobScheduler};
use crate::persistence::{RuntimeStore, UnitOfWork};
use crate::runtime::{OperationLogSink, ProcessRuntime};
use bpm_authz::AuthorizationStore;
use std::sync::Arc;

/// Settings that change how commands behave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandSettings {
    /// Enforce permission checks
    pub authorization_enabled: bool,
}

/// Storage, scheduling and execution collaborators wired into one engine.
#[derive(Clone)]
pub struct EngineServices {
    pub settings: CommandSettings,
    pub authorization_store: Arc<dyn AuthorizationStore>,
    pub runtime_store: Arc<dyn RuntimeStore>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub scheduler: Arc<dyn JobScheduler>,
    pub operation_log: Arc<dyn OperationLogSink>,
    pub process_runtime: Arc<dyn ProcessRuntime>,
    pub job_handlers: JobHandlerRegistry,
}

impl std::fmt::Debug for EngineServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineServices")
            .field("settings", &self.settings)
            .field("job_handlers", &self.job_handlers)
            .finish_non_exhaustive()
    }
}
