//! Persisted authorization grants

use crate::error::{EngineError, EngineResult};
use crate::permission::{Permission, Permissions};
use crate::resource::{Resource, ANY};
use serde::{Deserialize, Serialize};

/// How a grant affects the permission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationType {
    /// Applies to every user
    Global,
    /// Grants the carried permissions to one user or group
    Grant,
    /// Denies the carried permissions to one user or group
    Deny,
}

impl AuthorizationType {
    pub fn value(&self) -> i32 {
        match self {
            AuthorizationType::Global => 0,
            AuthorizationType::Grant => 1,
            AuthorizationType::Deny => 2,
        }
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, AuthorizationType::Deny)
    }
}

/// A grant row: subject, resource, resource id and permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub id: String,
    pub authorization_type: AuthorizationType,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub resource: Resource,
    pub resource_id: String,
    pub permissions: Permissions,
}

impl Authorization {
    pub fn new(authorization_type: AuthorizationType, resource: Resource) -> Self {
        let user_id = match authorization_type {
            AuthorizationType::Global => Some(ANY.to_string()),
            _ => None,
        };

        Self {
            id: crate::new_id(),
            authorization_type,
            user_id,
            group_id: None,
            resource,
            resource_id: ANY.to_string(),
            permissions: Permissions::NONE,
        }
    }

    pub fn global(resource: Resource) -> Self {
        Self::new(AuthorizationType::Global, resource)
    }

    pub fn grant(resource: Resource) -> Self {
        Self::new(AuthorizationType::Grant, resource)
    }

    pub fn deny(resource: Resource) -> Self {
        Self::new(AuthorizationType::Deny, resource)
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.add_permission(permission);
        self
    }

    pub fn add_permission(&mut self, permission: Permission) {
        self.permissions = self.permissions.with(permission);
    }

    pub fn remove_permission(&mut self, permission: Permission) {
        self.permissions = self.permissions.without(permission);
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// True if the grant names the wildcard resource id
    pub fn is_any_resource(&self) -> bool {
        self.resource_id == ANY
    }

    /// Check the subject shape before the grant is stored.
    pub fn validate(&self) -> EngineResult<()> {
        match self.authorization_type {
            AuthorizationType::Global => {
                if self.user_id.as_deref() != Some(ANY) {
                    return Err(EngineError::Validation(format!(
                        "Illegal value '{}' for userId for GLOBAL authorization: must be '{}'",
                        self.user_id.as_deref().unwrap_or("null"),
                        ANY
                    )));
                }
                if self.group_id.is_some() {
                    return Err(EngineError::Validation(
                        "Cannot use groupId for GLOBAL authorization".into(),
                    ));
                }
            }
            AuthorizationType::Grant | AuthorizationType::Deny => {
                match (&self.user_id, &self.group_id) {
                    (None, None) => {
                        return Err(EngineError::Validation(
                            "Authorization must either have a 'userId' or a 'groupId'".into(),
                        ))
                    }
                    (Some(_), Some(_)) => {
                        return Err(EngineError::Validation(
                            "Authorization must either have a 'userId' or a 'groupId', not both"
                                .into(),
                        ))
                    }
                    _ => {}
                }
            }
        }
        if self.resource_id.is_empty() {
            return Err(EngineError::Validation("Authorization resourceId is empty".into()));
        }
        Ok(())
    }
}
