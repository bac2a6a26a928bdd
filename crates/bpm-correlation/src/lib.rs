//! BPM Correlation - Message correlation engine
//!
//! Resolves an inbound message to the executions waiting for it, or to a
//! message start event, and dispatches it:
//!
//! ```text
//! lookup (no authentication) ──► authorize every result ──► dispatch
//!   executions first               update on the instance      resume with payload
//!   then the start event           create on the definition    start new instance
//! ```
//!
//! [`CorrelateMessageCmd`] needs exactly one target. [`CorrelateAllMessageCmd`]
//! takes any number of waiting executions and at most one new instance.

#![deny(unsafe_code)]

pub mod command;
pub mod correlation;
pub mod handler;

pub use command::{
    authorize, dispatch, CorrelateAllMessageCmd, CorrelateMessageCmd, MessageEventReceivedCmd,
    StartProcessInstanceByMessageCmd,
};
pub use correlation::{CorrelationSet, MessageCorrelation, MessageCorrelationResult};
pub use handler::{CorrelationHandler, DefaultCorrelationHandler};
