//! Public engine services
//!
//! Each service turns its calls into commands and runs them through the
//! engine's [`CommandExecutor`] on behalf of the service's subject.

mod authorization;
mod management;
mod repository;
mod runtime;
mod suspension;
mod task;

pub use authorization::{
    AuthorizationService, CreateAuthorizationCmd, DeleteAuthorizationCmd, IsUserAuthorizedCmd,
    SaveAuthorizationCmd, SelectAuthorizationsCmd,
};
pub use management::{JobQueryCmd, ManagementService};
pub use repository::RepositoryService;
pub use runtime::{MessageCorrelationBuilder, ProcessInstanceQueryCmd, RuntimeService};
pub use suspension::UpdateSuspensionStateBuilder;
pub use task::{DelegateTaskCmd, SetTaskPriorityCmd, TaskQueryCmd, TaskService};

use bpm_command::{Command, CommandExecutor};
use bpm_types::{Authentication, EngineResult};

/// Executor plus the subject commands run for
#[derive(Debug, Clone)]
pub(crate) struct ServiceContext<'a> {
    executor: &'a CommandExecutor,
    authentication: Option<Authentication>,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(executor: &'a CommandExecutor, authentication: Option<Authentication>) -> Self {
        Self {
            executor,
            authentication,
        }
    }

    pub(crate) fn execute<C, T>(&self, command: &C) -> EngineResult<T>
    where
        C: Command<T> + ?Sized,
    {
        self.executor.execute(self.authentication.as_ref(), command)
    }
}
