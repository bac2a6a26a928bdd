//! Command executor

use crate::command::Command;
use crate::context::CommandContext;
use crate::services::EngineServices;
use bpm_types::{Authentication, EngineError, EngineResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Runs commands, each in its own unit of work.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    services: Arc<EngineServices>,
}

impl CommandExecutor {
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Arc<EngineServices> {
        &self.services
    }

    /// Execute `command` on behalf of `authentication`.
    ///
    /// Errors abort the unit of work and are returned unchanged.
    #[instrument(
        skip(self, authentication, command),
        fields(command = command.name(), user_id = authentication.map(|a| a.user_id.as_str()))
    )]
    pub fn execute<C, T>(&self, authentication: Option<&Authentication>, command: &C) -> EngineResult<T>
    where
        C: Command<T> + ?Sized,
    {
        let ctx = CommandContext::new(self.services.clone(), authentication.cloned());
        let mut outcome = None;

        let result = self.services.unit_of_work.run(&mut || {
            outcome = Some(command.execute(&ctx)?);
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!("Command completed");
                outcome.ok_or_else(|| {
                    EngineError::Storage("unit of work committed without running the command".into())
                })
            }
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "Command failed on storage, unit of work rolled back");
                Err(err)
            }
            Err(err) => {
                debug!(error = %err, kind = ?err.kind(), "Command rejected, unit of work rolled back");
                Err(err)
            }
        }
    }
}
