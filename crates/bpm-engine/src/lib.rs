//! BPM Engine - Process engine facade
//!
//! Assembles the control core into a usable engine:
//!
//! - [`ProcessEngine`] wires the in-memory store, the command executor and
//!   the registered deferred-job handlers together
//! - services ([`RuntimeService`], [`RepositoryService`], [`ManagementService`],
//!   [`TaskService`], [`AuthorizationService`]) turn calls into commands run on
//!   behalf of one subject
//! - [`JobExecutor`] fires deferred suspension changes when they come due
//! - [`EngineConfig`] and [`init_tracing`] cover configuration and logging
//!
//! ```rust,ignore
//! let engine = ProcessEngine::builder().authorization_enabled(true).build()?;
//! let demo = Authentication::new("demo");
//!
//! engine
//!     .runtime_service(Some(&demo))
//!     .create_message_correlation("invoiceReceived")
//!     .process_instance_business_key("order-42")
//!     .correlate()?;
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod job_executor;
pub mod logging;
pub mod services;

pub use config::{AuthorizationConfig, EngineConfig, JobExecutorConfig, LoggingConfig};
pub use engine::{ProcessEngine, ProcessEngineBuilder};
pub use error::{ConfigError, ConfigResult};
pub use job_executor::{JobExecutionReport, JobExecutor};
pub use logging::init_tracing;
pub use services::{
    AuthorizationService, ManagementService, MessageCorrelationBuilder, RepositoryService,
    RuntimeService, TaskService, UpdateSuspensionStateBuilder,
};

pub use bpm_authz::AuthorizationQuery;
pub use bpm_command::{JobQuery, ProcessInstanceQuery, TaskQuery};
pub use bpm_correlation::MessageCorrelationResult;
pub use bpm_types::{
    Authentication, Authorization, AuthorizationType, EngineError, EngineResult, Permission,
    Resource,
};
