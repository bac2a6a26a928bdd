//! Command trait

use crate::context::CommandContext;
use bpm_types::EngineResult;

/// An atomic operation against engine state.
///
/// Commands run inside a unit of work opened by the
/// [`CommandExecutor`](crate::CommandExecutor). A command may execute other
/// commands directly through the same context; they then share its unit of work.
pub trait Command<T> {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<T>;

    /// Name used in logs and spans
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
