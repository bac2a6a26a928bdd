//! Permission checks
//!
//! A [`PermissionCheck`] is an ephemeral predicate built per request. Several
//! checks handed over together are OR-combined: the subject passes if any one
//! of them is satisfied.

use bpm_types::{Authentication, Permission, Resource};
use serde::{Deserialize, Serialize};

/// Column names a bulk query can take resource ids from
pub mod query_param {
    /// Id of the queried row itself
    pub const RES_ID: &str = "RES.ID_";
    /// Process instance owning the queried row
    pub const RES_PROC_INST_ID: &str = "RES.PROC_INST_ID_";
    /// Key of the process definition owning the queried row
    pub const PROC_DEF_KEY: &str = "PROCDEF.KEY_";
}

/// "Does the subject hold `permission` on `resource` / `resource_id`?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub permission: Permission,
    pub resource: Resource,
    /// Concrete resource id; `None` means only grants on ANY can satisfy the check
    pub resource_id: Option<String>,
    /// For bulk queries: column supplying the resource id of each row
    pub resource_id_query_param: Option<String>,
    /// Decision when no grant row references the resource at all
    pub no_match_default: Option<bool>,
}

impl PermissionCheck {
    pub fn new(permission: Permission, resource: Resource) -> Self {
        Self {
            permission,
            resource,
            resource_id: None,
            resource_id_query_param: None,
            no_match_default: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_query_param(mut self, query_param: impl Into<String>) -> Self {
        self.resource_id_query_param = Some(query_param.into());
        self
    }

    pub fn with_no_match_default(mut self, value: bool) -> Self {
        self.no_match_default = Some(value);
        self
    }

    /// Same check bound to a concrete resource id
    pub fn for_resource_id(&self, resource_id: Option<&str>) -> Self {
        Self {
            resource_id: resource_id.map(str::to_string),
            ..self.clone()
        }
    }
}

/// A subject together with the OR-combined checks it must satisfy.
///
/// This is what the storage gateway evaluates in its single boolean query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCheck {
    pub user_id: String,
    pub group_ids: Vec<String>,
    pub permission_checks: Vec<PermissionCheck>,
}

impl AuthorizationCheck {
    pub fn new(authentication: &Authentication, permission_checks: Vec<PermissionCheck>) -> Self {
        Self {
            user_id: authentication.user_id.clone(),
            group_ids: authentication.group_ids.clone(),
            permission_checks,
        }
    }
}
