//! BPM Command - Command execution core
//!
//! Every administrative operation is a [`Command`] run by the
//! [`CommandExecutor`] inside one unit of work:
//!
//! ```text
//! caller ──► CommandExecutor::execute ──► UnitOfWork::run
//!                                           └─► Command::execute(&CommandContext)
//!                                                 ├─ permission checks
//!                                                 ├─ mutation
//!                                                 └─ audit entry / deferred job
//! ```
//!
//! The [`CommandContext`] holds the ambient subject for the duration of the
//! call. [`CommandContext::run_without_authentication`] lifts it for internal
//! lookups and restores it on every exit path.
//!
//! Storage, scheduling, audit and token execution are reached only through the
//! collaborator traits in [`persistence`], [`job`] and [`runtime`].

#![deny(unsafe_code)]

pub mod command;
pub mod context;
pub mod executor;
pub mod job;
pub mod persistence;
pub mod query;
pub mod runtime;
pub mod services;

pub use command::Command;
pub use context::{AuthenticationGuard, CommandContext};
pub use executor::CommandExecutor;
pub use job::{DeferredJob, ExecuteDeferredJobCmd, JobHandler, JobHandlerRegistry, JobScheduler};
pub use persistence::{RuntimeStore, SuspensionSelector, SuspensionTarget, UnitOfWork};
pub use query::{ExecutionQuery, JobQuery, ProcessInstanceQuery, TaskQuery};
pub use runtime::{OperationLogSink, ProcessRuntime};
pub use services::{CommandSettings, EngineServices};
