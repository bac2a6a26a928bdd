//! Authorization manager
//!
//! Entry point of the permission-check engine for one command invocation. It
//! knows whether enforcement is enabled and who the ambient subject is, and
//! fails open when either is missing.

use crate::check::{query_param, AuthorizationCheck, PermissionCheck};
use crate::query::{AuthorizationAware, AuthorizationQuery};
use crate::store::AuthorizationStore;
use bpm_types::{
    Authentication, Authorization, AuthorizationError, AuthorizationType, EngineError,
    EngineResult, Permission, Resource, Task,
};
use tracing::debug;

/// Permission-check engine bound to one subject.
pub struct AuthorizationManager<'a> {
    store: &'a dyn AuthorizationStore,
    enabled: bool,
    authentication: Option<Authentication>,
}

impl<'a> AuthorizationManager<'a> {
    pub fn new(
        store: &'a dyn AuthorizationStore,
        enabled: bool,
        authentication: Option<Authentication>,
    ) -> Self {
        Self {
            store,
            enabled,
            authentication,
        }
    }

    pub fn is_authorization_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Subject to check against, or `None` when checks are bypassed
    fn enforced_subject(&self) -> Option<&Authentication> {
        if self.enabled {
            self.authentication.as_ref()
        } else {
            None
        }
    }

    // ---- decisions ----

    /// Does the current subject hold `permission` on `resource` / `resource_id`?
    pub fn is_authorized(
        &self,
        permission: Permission,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> EngineResult<bool> {
        let mut check = PermissionCheck::new(permission, resource);
        check.resource_id = resource_id.map(str::to_string);
        self.is_authorized_any(&[check])
    }

    /// Is any of the OR-combined `checks` satisfied?
    pub fn is_authorized_any(&self, checks: &[PermissionCheck]) -> EngineResult<bool> {
        let Some(authentication) = self.enforced_subject() else {
            return Ok(true);
        };
        let request = AuthorizationCheck::new(authentication, checks.to_vec());
        let authorized = self.store.is_user_authorized(&request)?;
        debug!(
            user_id = %authentication.user_id,
            checks = checks.len(),
            authorized,
            "Evaluated permission checks"
        );
        Ok(authorized)
    }

    /// Does `subject`, rather than the ambient subject, hold `permission`?
    ///
    /// Always true while enforcement is disabled.
    pub fn is_subject_authorized(
        &self,
        subject: &Authentication,
        permission: Permission,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> EngineResult<bool> {
        if !self.enabled {
            return Ok(true);
        }
        let mut check = PermissionCheck::new(permission, resource);
        check.resource_id = resource_id.map(str::to_string);
        self.store
            .is_user_authorized(&AuthorizationCheck::new(subject, vec![check]))
    }

    /// Fail with an authorization error unless the subject holds `permission`.
    pub fn check_authorization(
        &self,
        permission: Permission,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> EngineResult<()> {
        let mut check = PermissionCheck::new(permission, resource);
        check.resource_id = resource_id.map(str::to_string);
        self.check_authorization_any(&[check])
    }

    /// Fail unless any of the OR-combined `checks` is satisfied.
    ///
    /// The error names the last check of the list.
    pub fn check_authorization_any(&self, checks: &[PermissionCheck]) -> EngineResult<()> {
        let Some(authentication) = self.enforced_subject() else {
            return Ok(());
        };
        if self.is_authorized_any(checks)? {
            return Ok(());
        }
        let Some(last) = checks.last() else {
            return Ok(());
        };
        Err(AuthorizationError::new(
            authentication.user_id.clone(),
            last.permission,
            last.resource,
            last.resource_id.as_deref(),
        )
        .into())
    }

    // ---- bulk queries ----

    /// Attach READ on `resource`, keyed by the row id, to `query`.
    pub fn configure_query<Q: AuthorizationAware>(&self, query: &mut Q, resource: Resource) {
        self.configure_query_with(query, resource, query_param::RES_ID, Permission::Read);
    }

    /// Attach one permission check to `query`, clearing any previous checks.
    ///
    /// With enforcement inactive the query is marked unchecked instead.
    pub fn configure_query_with<Q: AuthorizationAware>(
        &self,
        query: &mut Q,
        resource: Resource,
        query_param: &str,
        permission: Permission,
    ) {
        let auth = query.authorization_mut();
        auth.permission_checks.clear();
        auth.permission_checks
            .push(PermissionCheck::new(permission, resource).with_query_param(query_param));

        match self.enforced_subject() {
            Some(authentication) => {
                auth.check_enabled = true;
                auth.user_id = Some(authentication.user_id.clone());
                auth.group_ids = authentication.group_ids.clone();
            }
            None => {
                auth.check_enabled = false;
                auth.user_id = None;
                auth.group_ids.clear();
            }
        }
    }

    /// OR an additional check into an already configured query.
    pub fn add_permission_check<Q: AuthorizationAware>(
        &self,
        query: &mut Q,
        permission: Permission,
        resource: Resource,
        query_param: &str,
    ) {
        if self.enforced_subject().is_some() {
            query
                .authorization_mut()
                .permission_checks
                .push(PermissionCheck::new(permission, resource).with_query_param(query_param));
        }
    }

    // ---- composite checks ----

    /// CREATE on process instances, then CREATE_INSTANCES on the definition.
    pub fn check_create_process_instance(&self, process_definition_key: &str) -> EngineResult<()> {
        self.check_authorization(Permission::Create, Resource::ProcessInstance, None)?;
        self.check_authorization(
            Permission::CreateInstances,
            Resource::ProcessDefinition,
            Some(process_definition_key),
        )
    }

    pub fn check_read_process_instance(
        &self,
        process_instance_id: &str,
        process_definition_key: &str,
    ) -> EngineResult<()> {
        self.check_process_instance(
            process_instance_id,
            process_definition_key,
            Permission::Read,
            Permission::ReadInstances,
        )
    }

    pub fn check_update_process_instance(
        &self,
        process_instance_id: &str,
        process_definition_key: &str,
    ) -> EngineResult<()> {
        self.check_process_instance(
            process_instance_id,
            process_definition_key,
            Permission::Update,
            Permission::UpdateInstances,
        )
    }

    pub fn check_delete_process_instance(
        &self,
        process_instance_id: &str,
        process_definition_key: &str,
    ) -> EngineResult<()> {
        self.check_process_instance(
            process_instance_id,
            process_definition_key,
            Permission::Delete,
            Permission::DeleteInstances,
        )
    }

    fn check_process_instance(
        &self,
        process_instance_id: &str,
        process_definition_key: &str,
        instance_permission: Permission,
        definition_permission: Permission,
    ) -> EngineResult<()> {
        let on_instance = PermissionCheck::new(instance_permission, Resource::ProcessInstance)
            .with_resource_id(process_instance_id);
        let on_definition = PermissionCheck::new(definition_permission, Resource::ProcessDefinition)
            .with_resource_id(process_definition_key)
            .with_no_match_default(false);
        self.check_authorization_any(&[on_instance, on_definition])
    }

    pub fn check_update_instances_on_process_definition_by_key(
        &self,
        process_definition_key: &str,
    ) -> EngineResult<()> {
        self.check_authorization(
            Permission::UpdateInstances,
            Resource::ProcessDefinition,
            Some(process_definition_key),
        )
    }

    pub fn check_update_process_definition(&self, process_definition_key: &str) -> EngineResult<()> {
        self.check_authorization(
            Permission::Update,
            Resource::ProcessDefinition,
            Some(process_definition_key),
        )
    }

    pub fn check_read_task(&self, task: &Task) -> EngineResult<()> {
        self.check_task(task, Permission::Read, Permission::ReadTasks)
    }

    pub fn check_update_task(&self, task: &Task) -> EngineResult<()> {
        self.check_task(task, Permission::Update, Permission::UpdateTasks)
    }

    fn check_task(
        &self,
        task: &Task,
        task_permission: Permission,
        definition_permission: Permission,
    ) -> EngineResult<()> {
        if task.execution_id.is_some() {
            let on_task = PermissionCheck::new(task_permission, Resource::Task).with_resource_id(&task.id);
            let mut checks = vec![on_task];
            if let Some(key) = &task.process_definition_key {
                checks.push(
                    PermissionCheck::new(definition_permission, Resource::ProcessDefinition)
                        .with_resource_id(key)
                        .with_no_match_default(false),
                );
            }
            self.check_authorization_any(&checks)
        } else if task.case_execution_id.is_none() {
            self.check_authorization(task_permission, Resource::Task, Some(&task.id))
        } else {
            // case tasks carry no grants of their own
            Ok(())
        }
    }

    // ---- grant administration ----

    /// New, unsaved grant; requires CREATE on authorizations.
    pub fn create_new_authorization(
        &self,
        authorization_type: AuthorizationType,
        resource: Resource,
    ) -> EngineResult<Authorization> {
        self.check_authorization(Permission::Create, Resource::Authorization, None)?;
        Ok(Authorization::new(authorization_type, resource))
    }

    /// Insert or update a grant.
    pub fn save_authorization(&self, authorization: Authorization) -> EngineResult<Authorization> {
        authorization.validate()?;
        let existing = self.store.find_authorization_by_id(&authorization.id)?;
        match existing {
            Some(_) => {
                self.check_authorization(
                    Permission::Update,
                    Resource::Authorization,
                    Some(&authorization.id),
                )?;
                self.store.update_authorization(authorization.clone())?;
            }
            None => {
                self.check_authorization(Permission::Create, Resource::Authorization, None)?;
                self.store.insert_authorization(authorization.clone())?;
            }
        }
        debug!(authorization_id = %authorization.id, "Saved authorization");
        Ok(authorization)
    }

    /// Delete a grant and every grant that protects it.
    pub fn delete_authorization(&self, authorization_id: &str) -> EngineResult<()> {
        let authorization = self
            .store
            .find_authorization_by_id(authorization_id)?
            .ok_or_else(|| EngineError::not_found("authorization", authorization_id))?;
        self.check_authorization(
            Permission::Delete,
            Resource::Authorization,
            Some(&authorization.id),
        )?;
        self.store.delete_authorization(&authorization.id)?;
        self.delete_authorizations_by_resource_id(Resource::Authorization, Some(&authorization.id))?;
        Ok(())
    }

    pub fn select_authorizations(
        &self,
        mut query: AuthorizationQuery,
    ) -> EngineResult<Vec<Authorization>> {
        self.configure_query(&mut query, Resource::Authorization);
        self.store.select_authorizations(&query)
    }

    pub fn count_authorizations(&self, query: AuthorizationQuery) -> EngineResult<usize> {
        Ok(self.select_authorizations(query)?.len())
    }

    /// Grants on `resource` naming `resource_id` or ANY, without authorization filtering
    pub fn select_by_resource_including_any(
        &self,
        resource: Resource,
        resource_id: &str,
    ) -> EngineResult<Vec<Authorization>> {
        let mut query = AuthorizationQuery::new()
            .resource_type(resource)
            .resource_id(resource_id);
        query.include_any_resource_id = true;
        self.store.select_authorizations(&query)
    }

    /// Cascade-delete grants of a deleted resource.
    ///
    /// A no-op while enforcement is disabled.
    pub fn delete_authorizations_by_resource_id(
        &self,
        resource: Resource,
        resource_id: Option<&str>,
    ) -> EngineResult<usize> {
        let resource_id = resource_id
            .ok_or_else(|| EngineError::Validation("Resource id cannot be null".into()))?;
        if !self.enabled {
            return Ok(0);
        }
        let deleted = self
            .store
            .delete_authorizations_by_resource_id(resource, resource_id)?;
        debug!(resource = %resource, resource_id, deleted, "Deleted authorizations of resource");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator;
    use std::sync::RwLock;

    #[derive(Default)]
    struct VecStore {
        grants: RwLock<Vec<Authorization>>,
    }

    impl VecStore {
        fn with(grants: Vec<Authorization>) -> Self {
            Self {
                grants: RwLock::new(grants),
            }
        }
    }

    impl AuthorizationStore for VecStore {
        fn insert_authorization(&self, authorization: Authorization) -> EngineResult<()> {
            self.grants.write().unwrap().push(authorization);
            Ok(())
        }

        fn update_authorization(&self, authorization: Authorization) -> EngineResult<()> {
            let mut grants = self.grants.write().unwrap();
            grants.retain(|a| a.id != authorization.id);
            grants.push(authorization);
            Ok(())
        }

        fn delete_authorization(&self, id: &str) -> EngineResult<Option<Authorization>> {
            let mut grants = self.grants.write().unwrap();
            let pos = grants.iter().position(|a| a.id == id);
            Ok(pos.map(|p| grants.remove(p)))
        }

        fn find_authorization_by_id(&self, id: &str) -> EngineResult<Option<Authorization>> {
            Ok(self.grants.read().unwrap().iter().find(|a| a.id == id).cloned())
        }

        fn select_authorizations(&self, query: &AuthorizationQuery) -> EngineResult<Vec<Authorization>> {
            let grants = self.grants.read().unwrap();
            Ok(grants
                .iter()
                .filter(|a| query.matches(a))
                .filter(|a| query.authorization.is_visible(&grants, *a))
                .cloned()
                .collect())
        }

        fn delete_authorizations_by_resource_id(&self, resource: Resource, resource_id: &str) -> EngineResult<usize> {
            let mut grants = self.grants.write().unwrap();
            let before = grants.len();
            grants.retain(|a| !(a.resource == resource && a.resource_id == resource_id));
            Ok(before - grants.len())
        }

        fn is_user_authorized(&self, check: &AuthorizationCheck) -> EngineResult<bool> {
            Ok(evaluator::evaluate(&self.grants.read().unwrap(), check))
        }
    }

    fn test_user() -> Option<Authentication> {
        Some(Authentication::new("test"))
    }

    #[test]
    fn test_fails_open_when_disabled() {
        let store = VecStore::default();
        let manager = AuthorizationManager::new(&store, false, test_user());
        assert!(manager.is_authorized(Permission::Delete, Resource::Task, Some("t1")).unwrap());
        assert!(manager.check_create_process_instance("invoice").is_ok());
    }

    #[test]
    fn test_fails_open_without_authentication() {
        let store = VecStore::default();
        let manager = AuthorizationManager::new(&store, true, None);
        assert!(manager.check_authorization(Permission::Delete, Resource::Task, Some("t1")).is_ok());
    }

    #[test]
    fn test_is_subject_authorized_ignores_ambient_subject() {
        let store = VecStore::with(vec![Authorization::grant(Resource::Task)
            .with_group("accounting")
            .with_resource_id("t1")
            .with_permission(Permission::Read)]);
        let manager = AuthorizationManager::new(&store, true, None);
        let clerk = Authentication::new("clerk").with_groups(["accounting"]);
        let guest = Authentication::new("guest");

        assert!(manager
            .is_subject_authorized(&clerk, Permission::Read, Resource::Task, Some("t1"))
            .unwrap());
        assert!(!manager
            .is_subject_authorized(&guest, Permission::Read, Resource::Task, Some("t1"))
            .unwrap());

        let disabled = AuthorizationManager::new(&store, false, None);
        assert!(disabled
            .is_subject_authorized(&guest, Permission::Read, Resource::Task, Some("t1"))
            .unwrap());
    }

    #[test]
    fn test_create_process_instance_requires_both_grants() {
        let store = VecStore::default();
        let manager = AuthorizationManager::new(&store, true, test_user());
        let err = manager.check_create_process_instance("oneTaskProcess").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'CREATE' permission on resource 'ProcessInstance'."
        );

        store
            .insert_authorization(
                Authorization::grant(Resource::ProcessInstance)
                    .with_user("test")
                    .with_permission(Permission::Create),
            )
            .unwrap();
        let err = manager.check_create_process_instance("oneTaskProcess").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'CREATE_INSTANCES' permission on resource 'oneTaskProcess' of type 'ProcessDefinition'."
        );

        store
            .insert_authorization(
                Authorization::grant(Resource::ProcessDefinition)
                    .with_user("test")
                    .with_resource_id("oneTaskProcess")
                    .with_permission(Permission::CreateInstances),
            )
            .unwrap();
        assert!(manager.check_create_process_instance("oneTaskProcess").is_ok());
    }

    #[test]
    fn test_update_process_instance_names_last_check() {
        let store = VecStore::default();
        let manager = AuthorizationManager::new(&store, true, test_user());
        let err = manager
            .check_update_process_instance("pi-1", "invoice")
            .unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'UPDATE_INSTANCES' permission on resource 'invoice' of type 'ProcessDefinition'."
        );
    }

    #[test]
    fn test_update_process_instance_satisfied_by_either_grant() {
        let on_instance = VecStore::with(vec![Authorization::grant(Resource::ProcessInstance)
            .with_user("test")
            .with_resource_id("pi-1")
            .with_permission(Permission::Update)]);
        let manager = AuthorizationManager::new(&on_instance, true, test_user());
        assert!(manager.check_update_process_instance("pi-1", "invoice").is_ok());
        assert!(manager.check_update_process_instance("pi-2", "invoice").is_err());

        let on_definition = VecStore::with(vec![Authorization::grant(Resource::ProcessDefinition)
            .with_user("test")
            .with_resource_id("invoice")
            .with_permission(Permission::UpdateInstances)]);
        let manager = AuthorizationManager::new(&on_definition, true, test_user());
        assert!(manager.check_update_process_instance("pi-1", "invoice").is_ok());
        assert!(manager.check_update_process_instance("pi-2", "invoice").is_ok());
    }

    #[test]
    fn test_read_instances_on_definition_reads_every_instance() {
        let store = VecStore::with(vec![Authorization::grant(Resource::ProcessDefinition)
            .with_user("test")
            .with_resource_id("invoice")
            .with_permission(Permission::ReadInstances)]);
        let manager = AuthorizationManager::new(&store, true, test_user());
        assert!(manager.check_read_process_instance("pi-1", "invoice").is_ok());
        assert!(manager.check_read_process_instance("pi-7", "invoice").is_ok());
        assert!(manager.check_read_process_instance("pi-1", "other").is_err());
    }

    #[test]
    fn test_task_checks() {
        let store = VecStore::with(vec![Authorization::grant(Resource::ProcessDefinition)
            .with_user("test")
            .with_resource_id("invoice")
            .with_permission(Permission::UpdateTasks)]);
        let manager = AuthorizationManager::new(&store, true, test_user());

        let definition = bpm_types::ProcessDefinition::new("invoice", 1);
        let instance = bpm_types::Execution::process_instance(&definition);
        let process_task = Task::for_execution(&instance);
        assert!(manager.check_update_task(&process_task).is_ok());
        assert!(manager.check_read_task(&process_task).is_err());

        let standalone = Task::standalone().with_id("t1");
        let err = manager.check_update_task(&standalone).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The user with id 'test' does not have 'UPDATE' permission on resource 't1' of type 'Task'."
        );

        let case_task = Task::standalone().with_case_execution("case-1");
        assert!(manager.check_update_task(&case_task).is_ok());
    }

    #[test]
    fn test_configure_query() {
        let store = VecStore::default();
        let mut query = AuthorizationQuery::new();

        AuthorizationManager::new(&store, true, test_user()).configure_query(&mut query, Resource::Task);
        assert!(query.authorization.check_enabled);
        assert_eq!(query.authorization.user_id.as_deref(), Some("test"));
        assert_eq!(query.authorization.permission_checks.len(), 1);
        let check = &query.authorization.permission_checks[0];
        assert_eq!(check.permission, Permission::Read);
        assert_eq!(check.resource_id_query_param.as_deref(), Some(query_param::RES_ID));

        AuthorizationManager::new(&store, false, test_user()).configure_query(&mut query, Resource::Task);
        assert!(!query.authorization.check_enabled);
        assert!(query.authorization.user_id.is_none());
        assert_eq!(query.authorization.permission_checks.len(), 1);
    }

    #[test]
    fn test_grant_administration_is_authorized() {
        let admin = Authentication::new("admin");
        let store = VecStore::with(vec![Authorization::grant(Resource::Authorization)
            .with_user("admin")
            .with_permission(Permission::All)]);

        let denied = AuthorizationManager::new(&store, true, test_user());
        assert!(denied
            .create_new_authorization(AuthorizationType::Grant, Resource::Task)
            .unwrap_err()
            .is_authorization());

        let manager = AuthorizationManager::new(&store, true, Some(admin));
        let grant = manager
            .create_new_authorization(AuthorizationType::Grant, Resource::Task)
            .unwrap()
            .with_user("demo")
            .with_permission(Permission::Read);
        let saved = manager.save_authorization(grant).unwrap();

        let protecting = Authorization::grant(Resource::Authorization)
            .with_user("demo")
            .with_resource_id(saved.id.clone())
            .with_permission(Permission::Read);
        manager.save_authorization(protecting).unwrap();

        manager.delete_authorization(&saved.id).unwrap();
        let remaining = store.grants.read().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id.as_deref(), Some("admin"));
    }

    #[test]
    fn test_delete_by_resource_id() {
        let store = VecStore::with(vec![Authorization::grant(Resource::Task)
            .with_user("demo")
            .with_resource_id("t1")
            .with_permission(Permission::Read)]);

        let disabled = AuthorizationManager::new(&store, false, None);
        assert!(disabled
            .delete_authorizations_by_resource_id(Resource::Task, None)
            .is_err());
        assert_eq!(
            disabled
                .delete_authorizations_by_resource_id(Resource::Task, Some("t1"))
                .unwrap(),
            0
        );

        let enabled = AuthorizationManager::new(&store, true, None);
        assert_eq!(
            enabled
                .delete_authorizations_by_resource_id(Resource::Task, Some("t1"))
                .unwrap(),
            1
        );
    }
}
