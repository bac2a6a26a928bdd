//! BPM Types - Shared domain model for the process engine control core
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - [`Resource`] and [`Permission`] / [`Permissions`] describe what a grant covers.
//! - [`Authorization`] is a persisted grant (GLOBAL, GRANT or DENY).
//! - [`Authentication`] is the subject on whose behalf a command runs.
//! - [`SuspensionState`] is carried by process definitions, process instances,
//!   jobs and job definitions.
//! - [`EngineError`] is the single error taxonomy that crosses crate boundaries.

#![deny(unsafe_code)]

pub mod authentication;
pub mod authorization;
pub mod error;
pub mod job;
pub mod operation_log;
pub mod permission;
pub mod process;
pub mod resource;
pub mod subscription;
pub mod suspension;
pub mod task;

pub use authentication::Authentication;
pub use authorization::{Authorization, AuthorizationType};
pub use error::{
    ensure_not_empty, ensure_not_null, AuthorizationError, EngineError, EngineResult, ErrorKind,
};
pub use job::{Job, JobDefinition};
pub use operation_log::{PropertyChange, UserOperationLogEntry};
pub use permission::{Permission, Permissions};
pub use process::{Execution, ProcessDefinition};
pub use resource::{Resource, ANY};
pub use subscription::{EventSubscription, EventType};
pub use suspension::SuspensionState;
pub use task::{DelegationState, Task};

use std::collections::BTreeMap;

/// Process variables keyed by name
pub type VariableMap = BTreeMap<String, serde_json::Value>;

/// Generate a new entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
