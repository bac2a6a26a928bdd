//! Command context
//!
//! One [`CommandContext`] exists per top-level command invocation. It carries
//! the ambient subject explicitly instead of through global state, and hands
//! out the collaborators a command needs.

use crate::job::{JobHandlerRegistry, JobScheduler};
use crate::persistence::RuntimeStore;
use crate::runtime::{OperationLogSink, ProcessRuntime};
use crate::services::{CommandSettings, EngineServices};
use bpm_authz::AuthorizationManager;
use bpm_types::{Authentication, EngineError, EngineResult, UserOperationLogEntry};
use std::cell::RefCell;
use std::sync::Arc;

/// Per-invocation state of a running command.
pub struct CommandContext {
    services: Arc<EngineServices>,
    authentication: RefCell<Option<Authentication>>,
}

impl CommandContext {
    pub fn new(services: Arc<EngineServices>, authentication: Option<Authentication>) -> Self {
        Self {
            services,
            authentication: RefCell::new(authentication),
        }
    }

    /// The ambient subject, if any
    pub fn authentication(&self) -> Option<Authentication> {
        self.authentication.borrow().clone()
    }

    pub fn authenticated_user_id(&self) -> Option<String> {
        self.authentication.borrow().as_ref().map(|a| a.user_id.clone())
    }

    /// Run `body` with no ambient subject.
    ///
    /// The previous subject is restored on every exit path, including panics.
    pub fn run_without_authentication<T>(&self, body: impl FnOnce() -> T) -> T {
        let _guard = AuthenticationGuard::suspend(&self.authentication);
        body()
    }

    /// Permission-check engine bound to the current subject
    pub fn authorization_manager(&self) -> AuthorizationManager<'_> {
        AuthorizationManager::new(
            self.services.authorization_store.as_ref(),
            self.services.settings.authorization_enabled,
            self.authentication(),
        )
    }

    pub fn settings(&self) -> CommandSettings {
        self.services.settings
    }

    pub fn runtime_store(&self) -> &dyn RuntimeStore {
        self.services.runtime_store.as_ref()
    }

    pub fn scheduler(&self) -> &dyn JobScheduler {
        self.services.scheduler.as_ref()
    }

    pub fn process_runtime(&self) -> &dyn ProcessRuntime {
        self.services.process_runtime.as_ref()
    }

    pub fn operation_log(&self) -> &dyn OperationLogSink {
        self.services.operation_log.as_ref()
    }

    pub fn job_handlers(&self) -> &JobHandlerRegistry {
        &self.services.job_handlers
    }

    /// Record an operation on behalf of the current subject
    pub fn log_user_operation(&self, mut entry: UserOperationLogEntry) -> EngineResult<()> {
        entry.user_id = self.authenticated_user_id();
        self.services.operation_log.log_user_operation(entry)
    }

    // ---- checks that need a lookup first ----

    pub fn check_update_process_instance_by_id(&self, process_instance_id: &str) -> EngineResult<()> {
        let instance = self
            .runtime_store()
            .find_execution_by_id(process_instance_id)?
            .ok_or_else(|| EngineError::not_found("process instance", process_instance_id))?;
        self.authorization_manager().check_update_process_instance(
            &instance.process_instance_id,
            &instance.process_definition_key,
        )
    }

    pub fn check_read_process_instance_by_id(&self, process_instance_id: &str) -> EngineResult<()> {
        let instance = self
            .runtime_store()
            .find_execution_by_id(process_instance_id)?
            .ok_or_else(|| EngineError::not_found("process instance", process_instance_id))?;
        self.authorization_manager().check_read_process_instance(
            &instance.process_instance_id,
            &instance.process_definition_key,
        )
    }

    pub fn check_update_instances_on_process_definition_by_id(
        &self,
        process_definition_id: &str,
    ) -> EngineResult<()> {
        let key = self.process_definition_key(process_definition_id)?;
        self.authorization_manager()
            .check_update_instances_on_process_definition_by_key(&key)
    }

    pub fn check_update_process_definition_by_id(&self, process_definition_id: &str) -> EngineResult<()> {
        let key = self.process_definition_key(process_definition_id)?;
        self.authorization_manager().check_update_process_definition(&key)
    }

    fn process_definition_key(&self, process_definition_id: &str) -> EngineResult<String> {
        self.runtime_store()
            .find_process_definition_by_id(process_definition_id)?
            .map(|d| d.key)
            .ok_or_else(|| EngineError::not_found("process definition", process_definition_id))
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("authentication", &self.authentication.borrow())
            .finish_non_exhaustive()
    }
}

/// Clears an authentication slot and restores it when dropped.
pub struct AuthenticationGuard<'a> {
    slot: &'a RefCell<Option<Authentication>>,
    saved: Option<Authentication>,
}

impl<'a> AuthenticationGuard<'a> {
    pub fn suspend(slot: &'a RefCell<Option<Authentication>>) -> Self {
        let saved = slot.replace(None);
        Self { slot, saved }
    }
}

impl Drop for AuthenticationGuard<'_> {
    fn drop(&mut self) {
        self.slot.replace(self.saved.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_guard_restores_on_drop() {
        let slot = RefCell::new(Some(Authentication::new("demo")));
        {
            let _guard = AuthenticationGuard::suspend(&slot);
            assert!(slot.borrow().is_none());
        }
        assert_eq!(slot.borrow().as_ref().map(|a| a.user_id.as_str()), Some("demo"));
    }

    #[test]
    fn test_guard_nests() {
        let slot = RefCell::new(Some(Authentication::new("demo")));
        {
            let _outer = AuthenticationGuard::suspend(&slot);
            {
                let _inner = AuthenticationGuard::suspend(&slot);
                assert!(slot.borrow().is_none());
            }
            assert!(slot.borrow().is_none());
        }
        assert!(slot.borrow().is_some());
    }

    #[test]
    fn test_guard_restores_on_error_and_panic() {
        let slot = RefCell::new(Some(Authentication::new("demo")));

        let result: Result<(), &str> = (|| {
            let _guard = AuthenticationGuard::suspend(&slot);
            Err("boom")
        })();
        assert!(result.is_err());
        assert!(slot.borrow().is_some());

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _guard = AuthenticationGuard::suspend(&slot);
            panic!("unwind");
        }));
        assert!(outcome.is_err());
        assert!(slot.borrow().is_some());
    }
}
