//! Grant evaluation
//!
//! Pure decision logic over a set of grant rows. Storage gateways that cannot
//! push the decision into their query language call [`evaluate`] directly.
//!
//! For a single check the rules are:
//!
//! 1. A row is *relevant* when its resource type matches, it applies to the
//!    subject (GLOBAL rows apply to everyone, GRANT/DENY rows to the named user
//!    or one of the subject's groups) and its resource id is either the checked
//!    id or ANY.
//! 2. No relevant rows: the check's `no_match_default` decides (false if unset).
//! 3. Otherwise the check passes iff some GRANT or GLOBAL row carries the
//!    permission and no DENY row carrying it has equal or broader resource scope.

use crate::check::{AuthorizationCheck, PermissionCheck};
use bpm_types::{Authorization, AuthorizationType, ANY};

/// How much of a resource type a grant row covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceScope {
    /// One resource id
    Instance,
    /// Every resource of the type
    Any,
}

impl ResourceScope {
    pub fn of(authorization: &Authorization) -> Self {
        if authorization.is_any_resource() {
            ResourceScope::Any
        } else {
            ResourceScope::Instance
        }
    }
}

fn applies_to_subject(authorization: &Authorization, user_id: &str, group_ids: &[String]) -> bool {
    match authorization.authorization_type {
        AuthorizationType::Global => true,
        AuthorizationType::Grant | AuthorizationType::Deny => {
            let user_match = authorization
                .user_id
                .as_deref()
                .is_some_and(|u| u == user_id || u == ANY);
            let group_match = authorization
                .group_id
                .as_deref()
                .is_some_and(|g| group_ids.iter().any(|id| id == g));
            user_match || group_match
        }
    }
}

fn is_relevant(authorization: &Authorization, check: &PermissionCheck) -> bool {
    if authorization.resource != check.resource {
        return false;
    }
    authorization.is_any_resource()
        || check
            .resource_id
            .as_deref()
            .is_some_and(|id| id == authorization.resource_id)
}

/// Evaluate one permission check for a subject against `grants`.
pub fn evaluate_check<'a, I>(grants: I, user_id: &str, group_ids: &[String], check: &PermissionCheck) -> bool
where
    I: IntoIterator<Item = &'a Authorization>,
{
    let relevant: Vec<&Authorization> = grants
        .into_iter()
        .filter(|a| is_relevant(a, check))
        .filter(|a| applies_to_subject(a, user_id, group_ids))
        .collect();

    if relevant.is_empty() {
        return check.no_match_default.unwrap_or(false);
    }

    let carrying = relevant
        .iter()
        .filter(|a| a.permissions.contains(check.permission));

    let broadest_deny = carrying
        .clone()
        .filter(|a| a.authorization_type.is_deny())
        .map(|a| ResourceScope::of(a))
        .max();

    carrying
        .filter(|a| !a.authorization_type.is_deny())
        .any(|grant| match broadest_deny {
            Some(deny_scope) => deny_scope < ResourceScope::of(grant),
            None => true,
        })
}

/// Evaluate an OR-combination of checks.
pub fn evaluate(grants: &[Authorization], check: &AuthorizationCheck) -> bool {
    check
        .permission_checks
        .iter()
        .any(|c| evaluate_check(grants, &check.user_id, &check.group_ids, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpm_types::{Permission, Resource};
    use proptest::prelude::*;

    fn user_check(permission: Permission, resource: Resource, id: Option<&str>) -> AuthorizationCheck {
        let mut check = PermissionCheck::new(permission, resource);
        check.resource_id = id.map(str::to_string);
        AuthorizationCheck {
            user_id: "test".into(),
            group_ids: vec!["accounting".into()],
            permission_checks: vec![check],
        }
    }

    #[test]
    fn test_no_grants_denies() {
        let check = user_check(Permission::Read, Resource::ProcessInstance, Some("pi-1"));
        assert!(!evaluate(&[], &check));
    }

    #[test]
    fn test_grant_on_any_covers_every_id() {
        let grants = vec![Authorization::grant(Resource::ProcessInstance)
            .with_user("test")
            .with_permission(Permission::Read)];
        assert!(evaluate(&grants, &user_check(Permission::Read, Resource::ProcessInstance, Some("pi-1"))));
        assert!(evaluate(&grants, &user_check(Permission::Read, Resource::ProcessInstance, None)));
        assert!(!evaluate(&grants, &user_check(Permission::Update, Resource::ProcessInstance, Some("pi-1"))));
    }

    #[test]
    fn test_grant_on_instance_covers_only_that_id() {
        let grants = vec![Authorization::grant(Resource::ProcessInstance)
            .with_user("test")
            .with_resource_id("pi-1")
            .with_permission(Permission::Read)];
        assert!(evaluate(&grants, &user_check(Permission::Read, Resource::ProcessInstance, Some("pi-1"))));
        assert!(!evaluate(&grants, &user_check(Permission::Read, Resource::ProcessInstance, Some("pi-2"))));
        assert!(!evaluate(&grants, &user_check(Permission::Read, Resource::ProcessInstance, None)));
    }

    #[test]
    fn test_group_and_global_grants_apply() {
        let group = vec![Authorization::grant(Resource::Task)
            .with_group("accounting")
            .with_permission(Permission::Update)];
        assert!(evaluate(&group, &user_check(Permission::Update, Resource::Task, Some("t1"))));

        let other_group = vec![Authorization::grant(Resource::Task)
            .with_group("sales")
            .with_permission(Permission::Update)];
        assert!(!evaluate(&other_group, &user_check(Permission::Update, Resource::Task, Some("t1"))));

        let global = vec![Authorization::global(Resource::Task).with_permission(Permission::Update)];
        assert!(evaluate(&global, &user_check(Permission::Update, Resource::Task, Some("t1"))));
    }

    #[test]
    fn test_deny_of_equal_scope_wins() {
        let grants = vec![
            Authorization::grant(Resource::Task)
                .with_user("test")
                .with_resource_id("t1")
                .with_permission(Permission::Update),
            Authorization::deny(Resource::Task)
                .with_group("accounting")
                .with_resource_id("t1")
                .with_permission(Permission::Update),
        ];
        assert!(!evaluate(&grants, &user_check(Permission::Update, Resource::Task, Some("t1"))));
    }

    #[test]
    fn test_deny_of_broader_scope_wins() {
        let grants = vec![
            Authorization::grant(Resource::Task)
                .with_user("test")
                .with_resource_id("t1")
                .with_permission(Permission::Update),
            Authorization::deny(Resource::Task)
                .with_user("test")
                .with_permission(Permission::Update),
        ];
        assert!(!evaluate(&grants, &user_check(Permission::Update, Resource::Task, Some("t1"))));
    }

    #[test]
    fn test_narrower_deny_does_not_shadow_any_grant() {
        let grants = vec![
            Authorization::grant(Resource::Task)
                .with_user("test")
                .with_permission(Permission::Update),
            Authorization::deny(Resource::Task)
                .with_user("test")
                .with_resource_id("t1")
                .with_permission(Permission::Update),
        ];
        assert!(evaluate(&grants, &user_check(Permission::Update, Resource::Task, Some("t1"))));
    }

    #[test]
    fn test_deny_of_other_permission_is_ignored() {
        let grants = vec![
            Authorization::grant(Resource::Task)
                .with_user("test")
                .with_permission(Permission::Update),
            Authorization::deny(Resource::Task)
                .with_user("test")
                .with_permission(Permission::Delete),
        ];
        assert!(evaluate(&grants, &user_check(Permission::Update, Resource::Task, Some("t1"))));
    }

    #[test]
    fn test_no_match_default_only_without_relevant_rows() {
        let mut check = user_check(Permission::Update, Resource::ProcessDefinition, Some("invoice"));
        check.permission_checks[0].no_match_default = Some(true);
        assert!(evaluate(&[], &check));

        let unrelated = vec![Authorization::grant(Resource::ProcessDefinition)
            .with_user("test")
            .with_resource_id("invoice")
            .with_permission(Permission::Read)];
        assert!(!evaluate(&unrelated, &check));
    }

    #[test]
    fn test_or_combination() {
        let grants = vec![Authorization::grant(Resource::ProcessDefinition)
            .with_user("test")
            .with_resource_id("invoice")
            .with_permission(Permission::UpdateInstances)];
        let check = AuthorizationCheck {
            user_id: "test".into(),
            group_ids: vec![],
            permission_checks: vec![
                PermissionCheck::new(Permission::Update, Resource::ProcessInstance).with_resource_id("pi-1"),
                PermissionCheck::new(Permission::UpdateInstances, Resource::ProcessDefinition)
                    .with_resource_id("invoice")
                    .with_no_match_default(false),
            ],
        };
        assert!(evaluate(&grants, &check));
    }

    fn arb_permission() -> impl Strategy<Value = Permission> {
        prop::sample::select(vec![
            Permission::Read,
            Permission::Update,
            Permission::Create,
            Permission::Delete,
            Permission::ReadInstances,
            Permission::UpdateInstances,
        ])
    }

    fn arb_resource() -> impl Strategy<Value = Resource> {
        prop::sample::select(Resource::ALL.to_vec())
    }

    fn arb_resource_id() -> impl Strategy<Value = String> {
        prop_oneof![Just(ANY.to_string()), "[a-c]{1}".prop_map(String::from)]
    }

    fn arb_authorization() -> impl Strategy<Value = Authorization> {
        (
            prop_oneof![
                Just(AuthorizationType::Global),
                Just(AuthorizationType::Grant),
                Just(AuthorizationType::Deny)
            ],
            arb_resource(),
            arb_resource_id(),
            prop::collection::vec(arb_permission(), 0..3),
            prop_oneof![Just("test"), Just("other")],
        )
            .prop_map(|(kind, resource, id, perms, user)| {
                let mut auth = Authorization::new(kind, resource).with_resource_id(id);
                if kind != AuthorizationType::Global {
                    auth = auth.with_user(user);
                }
                for p in perms {
                    auth.add_permission(p);
                }
                auth
            })
    }

    proptest! {
        #[test]
        fn deny_only_never_authorizes(
            permission in arb_permission(),
            resource in arb_resource(),
            id in "[a-c]{1}",
            denies in prop::collection::vec(arb_resource_id(), 0..4),
        ) {
            let grants: Vec<Authorization> = denies
                .into_iter()
                .map(|rid| Authorization::deny(resource).with_user("test").with_resource_id(rid).with_permission(permission))
                .collect();
            let check = user_check(permission, resource, Some(id.as_str()));
            prop_assert!(!evaluate(&grants, &check));
        }

        #[test]
        fn any_grant_without_deny_authorizes(
            permission in arb_permission(),
            resource in arb_resource(),
            id in "[a-c]{1}",
        ) {
            let grants = vec![Authorization::grant(resource).with_user("test").with_permission(permission)];
            prop_assert!(evaluate(&grants, &user_check(permission, resource, Some(id.as_str()))));
        }

        #[test]
        fn adding_a_broad_deny_never_grants(
            grants in prop::collection::vec(arb_authorization(), 0..6),
            permission in arb_permission(),
            resource in arb_resource(),
            id in "[a-c]{1}",
        ) {
            let check = user_check(permission, resource, Some(id.as_str()));
            let mut with_deny = grants.clone();
            with_deny.push(Authorization::deny(resource).with_user("test").with_permission(permission));
            prop_assert!(!evaluate(&with_deny, &check));
        }

        #[test]
        fn or_combination_is_monotonic(
            grants in prop::collection::vec(arb_authorization(), 0..6),
            first in arb_permission(),
            second in arb_permission(),
            resource in arb_resource(),
        ) {
            let single = user_check(first, resource, Some("a"));
            let mut combined = single.clone();
            combined.permission_checks.push(PermissionCheck::new(second, resource).with_resource_id("b"));
            if evaluate(&grants, &single) {
                prop_assert!(evaluate(&grants, &combined));
            }
        }
    }
}
