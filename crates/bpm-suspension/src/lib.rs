//! BPM Suspension - Suspension state machine
//!
//! Process definitions, process instances, job definitions and jobs can be
//! suspended and activated, either immediately or at a future date. One
//! generic state machine ([`SetSuspensionStateCmd`]) drives all four; the
//! per-resource differences live in a [`SuspensionStrategy`].
//!
//! Cascades run inside the same command, so a failure anywhere rolls back the
//! whole change. Scheduled changes are stored as deferred jobs and replayed by
//! [`SuspensionJobHandler`] when they come due.
//!
//! ```rust,ignore
//! let request = SuspensionRequest::suspend(SuspensionTarget::ProcessDefinition)
//!     .by_process_definition_key("invoice")
//!     .include_sub_resources(true);
//! executor.execute(Some(&user), &SetSuspensionStateCmd::new(request))?;
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod handler;
pub mod request;
pub mod strategy;

pub use bpm_command::SuspensionTarget;
pub use command::{apply, DeferredSuspension, Origin, SetSuspensionStateCmd, SUSPENSION_STATE_PROPERTY};
pub use handler::SuspensionJobHandler;
pub use request::{SelectorKind, Selectors, SuspensionRequest};
pub use strategy::{deferred_handler_types, strategy_for, SuspensionStrategy};
