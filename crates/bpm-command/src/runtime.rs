//! Execution capability and audit sink
//!
//! The process graph itself is not part of the control core. Commands drive it
//! only through [`ProcessRuntime`], and record what they did through
//! [`OperationLogSink`].

use bpm_types::{
    EngineResult, EventSubscription, Execution, ProcessDefinition, UserOperationLogEntry,
    VariableMap,
};

/// Token execution of process instances
pub trait ProcessRuntime: Send + Sync {
    /// Deliver an event to the execution waiting on `subscription` and let it continue.
    fn event_received(
        &self,
        subscription: &EventSubscription,
        payload: Option<VariableMap>,
    ) -> EngineResult<()>;

    /// Create a process instance of `definition` positioned at `start_activity_id`
    /// (the definition's initial activity when `None`) and start it.
    fn start_process_instance(
        &self,
        definition: &ProcessDefinition,
        business_key: Option<&str>,
        start_activity_id: Option<&str>,
        variables: VariableMap,
    ) -> EngineResult<Execution>;
}

/// Destination of user operation log entries
pub trait OperationLogSink: Send + Sync {
    fn log_user_operation(&self, entry: UserOperationLogEntry) -> EngineResult<()>;
}
