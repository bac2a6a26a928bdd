//! BPM Authz - Permission-check engine
//!
//! Decides whether the ambient subject may perform an operation on a resource.
//!
//! # Decision model
//!
//! - Enforcement is off, or nobody is authenticated: every check passes.
//! - Otherwise grants are looked up by resource type, resource id (exact or ANY)
//!   and subject (user, group, or GLOBAL). A DENY of equal or broader resource
//!   scope than a GRANT wins. See [`evaluator`] for the exact rules.
//! - Several [`PermissionCheck`]s handed over together are OR-combined; a failed
//!   combination reports the last check of the list.
//!
//! Bulk queries are never rejected; they are filtered row by row through
//! [`QueryAuthorization`].

#![deny(unsafe_code)]

pub mod check;
pub mod evaluator;
pub mod manager;
pub mod query;
pub mod store;

pub use check::{query_param, AuthorizationCheck, PermissionCheck};
pub use manager::AuthorizationManager;
pub use query::{AuthorizationAware, AuthorizationQuery, QueryAuthorization, ResourceColumns};
pub use store::AuthorizationStore;
