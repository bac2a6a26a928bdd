//! Authorization-aware bulk queries
//!
//! Bulk reads do not raise authorization errors; instead the query carries the
//! subject and the OR-combined checks, and the storage gateway drops every row
//! the subject may not see. Each check names the column the row's resource id
//! is taken from ([`PermissionCheck::resource_id_query_param`]).

use crate::check::{query_param, PermissionCheck};
use crate::evaluator;
use bpm_types::{Authorization, Execution, Job, Permission, Resource, Task, ANY};

/// Authorization part of a bulk query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryAuthorization {
    pub check_enabled: bool,
    pub user_id: Option<String>,
    pub group_ids: Vec<String>,
    pub permission_checks: Vec<PermissionCheck>,
}

impl QueryAuthorization {
    /// Decide whether `row` is visible.
    ///
    /// Always true while checking is disabled.
    pub fn is_visible(&self, grants: &[Authorization], row: &dyn ResourceColumns) -> bool {
        if !self.check_enabled {
            return true;
        }
        let user_id = match &self.user_id {
            Some(user_id) => user_id,
            None => return true,
        };
        self.permission_checks.iter().any(|check| {
            let resource_id = check
                .resource_id_query_param
                .as_deref()
                .and_then(|column| row.column(column));
            let bound = check.for_resource_id(resource_id);
            evaluator::evaluate_check(grants, user_id, &self.group_ids, &bound)
        })
    }
}

/// Queries that can carry a [`QueryAuthorization`]
pub trait AuthorizationAware {
    fn authorization(&self) -> &QueryAuthorization;

    fn authorization_mut(&mut self) -> &mut QueryAuthorization;
}

/// Row access by column name, used to bind per-row resource ids.
pub trait ResourceColumns {
    fn column(&self, name: &str) -> Option<&str>;
}

impl ResourceColumns for Execution {
    fn column(&self, name: &str) -> Option<&str> {
        match name {
            query_param::RES_ID => Some(self.id.as_str()),
            query_param::RES_PROC_INST_ID => Some(self.process_instance_id.as_str()),
            query_param::PROC_DEF_KEY => Some(self.process_definition_key.as_str()),
            _ => None,
        }
    }
}

impl ResourceColumns for Job {
    fn column(&self, name: &str) -> Option<&str> {
        match name {
            query_param::RES_ID => Some(self.id.as_str()),
            query_param::RES_PROC_INST_ID => self.process_instance_id.as_deref(),
            query_param::PROC_DEF_KEY => self.process_definition_key.as_deref(),
            _ => None,
        }
    }
}

impl ResourceColumns for Task {
    fn column(&self, name: &str) -> Option<&str> {
        match name {
            query_param::RES_ID => Some(self.id.as_str()),
            query_param::RES_PROC_INST_ID => self.process_instance_id.as_deref(),
            query_param::PROC_DEF_KEY => self.process_definition_key.as_deref(),
            _ => None,
        }
    }
}

impl ResourceColumns for Authorization {
    fn column(&self, name: &str) -> Option<&str> {
        match name {
            query_param::RES_ID => Some(self.id.as_str()),
            _ => None,
        }
    }
}

/// Query over stored grants
#[derive(Debug, Clone, Default)]
pub struct AuthorizationQuery {
    pub id: Option<String>,
    pub user_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub resource: Option<Resource>,
    pub resource_id: Option<String>,
    /// Also match grants on ANY when `resource_id` is set
    pub include_any_resource_id: bool,
    pub permission: Option<Permission>,
    pub authorization: QueryAuthorization,
}

impl AuthorizationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authorization_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn user_id_in<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_ids = user_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn group_id_in<I, S>(mut self, group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_ids = group_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource_type(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn has_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// True if `authorization` satisfies the query's filter criteria
    pub fn matches(&self, authorization: &Authorization) -> bool {
        if let Some(id) = &self.id {
            if &authorization.id != id {
                return false;
            }
        }
        if !self.user_ids.is_empty()
            && !authorization
                .user_id
                .as_ref()
                .is_some_and(|u| self.user_ids.contains(u))
        {
            return false;
        }
        if !self.group_ids.is_empty()
            && !authorization
                .group_id
                .as_ref()
                .is_some_and(|g| self.group_ids.contains(g))
        {
            return false;
        }
        if let Some(resource) = self.resource {
            if authorization.resource != resource {
                return false;
            }
        }
        if let Some(resource_id) = &self.resource_id {
            let any = self.include_any_resource_id && authorization.resource_id == ANY;
            if &authorization.resource_id != resource_id && !any {
                return false;
            }
        }
        if let Some(permission) = self.permission {
            if !authorization.has_permission(permission) {
                return false;
            }
        }
        true
    }
}

impl AuthorizationAware for AuthorizationQuery {
    fn authorization(&self) -> &QueryAuthorization {
        &self.authorization
    }

    fn authorization_mut(&mut self) -> &mut QueryAuthorization {
        &mut self.authorization
    }
}
