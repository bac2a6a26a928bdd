//! Error taxonomy shared by every engine component

use crate::permission::Permission;
use crate::resource::Resource;
use std::fmt;
use thiserror::Error;

/// Engine errors.
///
/// Only [`EngineError::Storage`] is transient; every other kind is a decision
/// about the request and is never retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or incomplete request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The subject lacks a required permission
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// A referenced resource does not exist
    #[error("{message}")]
    NotFound {
        kind: String,
        id: String,
        message: String,
    },

    /// A correlation matched zero or more than one target where exactly one was required
    #[error("{message}")]
    Cardinality {
        message_name: Option<String>,
        matches: usize,
        message: String,
    },

    /// Underlying storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored configuration could not be read back
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Cardinality,
    Storage,
    Serialization,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Authorization(_) => ErrorKind::Authorization,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Cardinality { .. } => ErrorKind::Cardinality,
            EngineError::Storage(_) => ErrorKind::Storage,
            EngineError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        let kind = kind.into();
        let id = id.into();
        let message = format!("Cannot find {} with id '{}'", kind, id);
        EngineError::NotFound { kind, id, message }
    }

    pub fn not_found_with(
        kind: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::NotFound {
            kind: kind.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn cardinality(
        message_name: Option<&str>,
        matches: usize,
        message: impl Into<String>,
    ) -> Self {
        EngineError::Cardinality {
            message_name: message_name.map(str::to_string),
            matches,
            message: message.into(),
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, EngineError::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// The subject lacks a required permission on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationError {
    pub user_id: String,
    pub permission_name: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
}

impl AuthorizationError {
    pub fn new(
        user_id: impl Into<String>,
        permission: Permission,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            permission_name: permission.name().to_string(),
            resource_type: resource.resource_name().to_string(),
            resource_id: resource_id.map(str::to_string),
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The user with id '{}' does not have '{}' permission on resource '",
            self.user_id, self.permission_name
        )?;
        match &self.resource_id {
            Some(id) => write!(f, "{}' of type '{}'.", id, self.resource_type),
            None => write!(f, "{}'.", self.resource_type),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Fail with a validation error when `value` is absent.
pub fn ensure_not_null<T>(name: &str, value: Option<T>) -> EngineResult<T> {
    value.ok_or_else(|| EngineError::Validation(format!("{} is null", name)))
}

/// Fail with a validation error when `value` is absent or empty.
pub fn ensure_not_empty<'a>(name: &str, value: Option<&'a str>) -> EngineResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EngineError::Validation(format!("{} is null or empty", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_message_without_resource_id() {
        let err = AuthorizationError::new("test", Permission::Create, Resource::ProcessInstance, None);
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'CREATE' permission on resource 'ProcessInstance'."
        );
    }

    #[test]
    fn test_authorization_message_with_resource_id() {
        let err = AuthorizationError::new(
            "test",
            Permission::CreateInstances,
            Resource::ProcessDefinition,
            Some("oneTaskProcess"),
        );
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'CREATE_INSTANCES' permission on resource 'oneTaskProcess' of type 'ProcessDefinition'."
        );
    }

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(EngineError::Storage("connection reset".into()).is_retryable());
        assert!(!EngineError::Validation("x".into()).is_retryable());
        assert!(!EngineError::not_found("task", "t1").is_retryable());
        let auth: EngineError =
            AuthorizationError::new("u", Permission::Read, Resource::Task, None).into();
        assert!(!auth.is_retryable());
        assert_eq!(auth.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_ensure_helpers() {
        assert_eq!(ensure_not_null("taskId", Some(3)).unwrap(), 3);
        let err = ensure_not_null::<i32>("taskId", None).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: taskId is null");
        assert!(ensure_not_empty("messageName", Some("")).is_err());
        assert_eq!(ensure_not_empty("messageName", Some("alert")).unwrap(), "alert");
    }
}
