//! End-to-end behaviour of the control core through the engine services.
//!
//! Covers permission decisions, suspension cascades and scheduling, and
//! message correlation against the in-memory store.

use bpm_engine::{
    Authentication, Authorization, EngineError, Permission, ProcessEngine, ProcessInstanceQuery,
    Resource,
};
use bpm_command::JobQuery;
use bpm_types::{
    EventSubscription, Execution, Job, JobDefinition, ProcessDefinition, SuspensionState,
    VariableMap,
};
use chrono::{Duration, Utc};
use proptest::prelude::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn kermit() -> Authentication {
    Authentication::new("kermit").with_groups(["muppets"])
}

/// Deploy `invoice:1` with `instances` running instances, each owning one job.
fn deploy_invoice(engine: &ProcessEngine, instances: usize) -> ProcessDefinition {
    let store = engine.store();
    let definition = ProcessDefinition::new("invoice", 1).with_id("invoice:1");
    store.deploy(definition.clone());
    let job_definition = JobDefinition::new("invoice:1", "invoice", "approve", "async-continuation");
    store.insert_job_definition(job_definition.clone());

    for n in 0..instances {
        let instance = Execution::process_instance(&definition).with_id(format!("pi-{n}"));
        store.insert_job(Job::for_definition(&job_definition, instance.id.clone()).with_id(format!("job-{n}")));
        store.insert_execution(instance);
    }
    definition
}

/// Two instances of `invoice:1` whose child executions wait for `message`.
fn waiting_for(engine: &ProcessEngine, message: &str) {
    let store = engine.store();
    let definition = deploy_invoice(engine, 0);
    for id in ["pi-a", "pi-b"] {
        let instance = Execution::process_instance(&definition).with_id(id);
        let waiting = Execution::child_of(&instance).with_id(format!("{id}-wait"));
        store.insert_subscription(EventSubscription::message(
            message,
            waiting.id.clone(),
            instance.id.clone(),
            "receiveAlert",
        ));
        store.insert_execution(instance);
        store.insert_execution(waiting);
    }
}

fn grant(user: &str, resource: Resource, resource_id: &str, permission: Permission) -> Authorization {
    Authorization::grant(resource)
        .with_user(user)
        .with_resource_id(resource_id)
        .with_permission(permission)
}

fn instance_states(engine: &ProcessEngine) -> Vec<SuspensionState> {
    engine
        .store()
        .process_instances_of("invoice:1")
        .into_iter()
        .map(|pi| pi.suspension_state)
        .collect()
}

fn job_states(engine: &ProcessEngine) -> Vec<SuspensionState> {
    engine
        .store()
        .jobs(&JobQuery::new())
        .into_iter()
        .map(|job| job.suspension_state)
        .collect()
}

// ---------------------------------------------------------------------------
// Permission-check engine
// ---------------------------------------------------------------------------

#[test]
fn missing_or_denied_grant_is_unauthorized() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    deploy_invoice(&engine, 1);
    let authorizations = engine.authorization_service(None);

    let nothing = authorizations
        .is_user_authorized("kermit", vec![], Permission::Update, Resource::ProcessInstance, Some("pi-0"))
        .unwrap();
    assert!(!nothing);

    engine.store().add_authorization(
        Authorization::deny(Resource::ProcessInstance)
            .with_user("kermit")
            .with_resource_id("pi-0")
            .with_permission(Permission::Update),
    );
    let denied = authorizations
        .is_user_authorized("kermit", vec![], Permission::Update, Resource::ProcessInstance, Some("pi-0"))
        .unwrap();
    assert!(!denied);

    let err = engine
        .runtime_service(Some(&kermit()))
        .suspend_process_instance_by_id("pi-0")
        .unwrap_err();
    assert!(err.is_authorization());
    assert_eq!(instance_states(&engine), vec![SuspensionState::Active]);
}

#[test]
fn grant_on_any_covers_every_resource_id() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    engine.store().add_authorization(
        Authorization::grant(Resource::ProcessDefinition)
            .with_user("kermit")
            .with_permission(Permission::Read),
    );
    let authorizations = engine.authorization_service(None);

    for id in ["invoice", "order", "anything-at-all"] {
        assert!(authorizations
            .is_user_authorized("kermit", vec![], Permission::Read, Resource::ProcessDefinition, Some(id))
            .unwrap());
    }
    assert!(!authorizations
        .is_user_authorized("gonzo", vec![], Permission::Read, Resource::ProcessDefinition, Some("invoice"))
        .unwrap());
}

#[test]
fn read_instances_on_definition_reads_all_instances() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    deploy_invoice(&engine, 3);
    engine.store().add_authorization(grant(
        "kermit",
        Resource::ProcessDefinition,
        "invoice",
        Permission::ReadInstances,
    ));

    let visible = engine
        .runtime_service(Some(&kermit()))
        .process_instances(ProcessInstanceQuery::new())
        .unwrap();
    assert_eq!(visible.len(), 3);
}

#[test]
fn read_on_one_instance_excludes_siblings() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    deploy_invoice(&engine, 3);
    engine
        .store()
        .add_authorization(grant("kermit", Resource::ProcessInstance, "pi-1", Permission::Read));

    let visible: Vec<String> = engine
        .runtime_service(Some(&kermit()))
        .process_instances(ProcessInstanceQuery::new())
        .unwrap()
        .into_iter()
        .map(|pi| pi.id)
        .collect();
    assert_eq!(visible, vec!["pi-1".to_string()]);
}

#[test]
fn group_grant_applies_to_members() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    deploy_invoice(&engine, 2);
    engine.store().add_authorization(
        Authorization::grant(Resource::ProcessInstance)
            .with_group("muppets")
            .with_permission(Permission::Update),
    );

    engine
        .runtime_service(Some(&kermit()))
        .suspend_process_instance_by_id("pi-0")
        .unwrap();
    assert_eq!(
        engine.store().execution("pi-0").unwrap().suspension_state,
        SuspensionState::Suspended
    );
}

// ---------------------------------------------------------------------------
// Suspension state machine
// ---------------------------------------------------------------------------

#[test]
fn definition_cascade_logs_once_and_suspends_everything() {
    let engine = ProcessEngine::builder().build().unwrap();
    deploy_invoice(&engine, 4);

    engine
        .repository_service(Some(&kermit()))
        .suspend_process_definition_by_id("invoice:1", true, None)
        .unwrap();

    assert!(engine.store().process_definition("invoice:1").unwrap().is_suspended());
    assert!(instance_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));
    assert!(job_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));

    let log = engine.store().operation_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation_type, "SuspendProcessDefinition");
    assert_eq!(log[0].user_id.as_deref(), Some("kermit"));
}

#[test]
fn definition_without_cascade_leaves_instances_running() {
    let engine = ProcessEngine::builder().build().unwrap();
    deploy_invoice(&engine, 2);

    engine
        .repository_service(None)
        .suspend_process_definition_by_key("invoice", false, None)
        .unwrap();

    assert!(engine.store().process_definition("invoice:1").unwrap().is_suspended());
    assert!(instance_states(&engine).iter().all(|s| *s == SuspensionState::Active));

    let job_definition_id = engine.store().job("job-0").unwrap().job_definition_id.unwrap();
    assert_eq!(
        engine.store().job_definition(&job_definition_id).unwrap().suspension_state,
        SuspensionState::Suspended
    );
}

#[test]
fn scheduled_suspension_applies_when_fired() {
    let engine = ProcessEngine::builder().build().unwrap();
    deploy_invoice(&engine, 2);
    let due = Utc::now() + Duration::hours(2);

    engine
        .repository_service(Some(&kermit()))
        .suspend_process_definition_by_id("invoice:1", true, Some(due))
        .unwrap();

    assert_eq!(engine.store().deferred_jobs().len(), 1);
    assert!(!engine.store().process_definition("invoice:1").unwrap().is_suspended());
    assert!(instance_states(&engine).iter().all(|s| *s == SuspensionState::Active));

    let early = engine.job_executor().execute_due_jobs(Utc::now()).unwrap();
    assert_eq!(early.acquired, 0);

    let report = engine
        .job_executor()
        .execute_due_jobs(due + Duration::seconds(1))
        .unwrap();
    assert_eq!(report.executed, 1);
    assert!(engine.store().deferred_jobs().is_empty());
    assert!(engine.store().process_definition("invoice:1").unwrap().is_suspended());
    assert!(instance_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));
    assert!(job_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));
}

#[test]
fn scheduling_still_requires_permission() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    deploy_invoice(&engine, 1);

    let err = engine
        .repository_service(Some(&kermit()))
        .suspend_process_definition_by_key("invoice", false, Some(Utc::now() + Duration::days(1)))
        .unwrap_err();
    assert!(err.is_authorization());
    assert!(engine.store().deferred_jobs().is_empty());
}

#[test]
fn job_definition_suspension_includes_jobs_on_request() {
    let engine = ProcessEngine::builder().build().unwrap();
    deploy_invoice(&engine, 2);
    let job_definition_id = engine.store().job("job-0").unwrap().job_definition_id.unwrap();

    engine
        .management_service(None)
        .suspend_job_definition_by_id(job_definition_id.clone(), true, None)
        .unwrap();
    assert!(job_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));

    engine
        .management_service(None)
        .activate_job_definition_by_id(job_definition_id, false, None)
        .unwrap();
    assert!(job_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));
}

// ---------------------------------------------------------------------------
// Message correlation
// ---------------------------------------------------------------------------

#[test]
fn correlate_one_rejects_when_any_candidate_is_unauthorized() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    waiting_for(&engine, "alert");
    engine
        .store()
        .add_authorization(grant("kermit", Resource::ProcessInstance, "pi-a", Permission::Update));

    let err = engine
        .runtime_service(Some(&kermit()))
        .correlate_message("alert")
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
    assert!(engine.store().received_events().is_empty());
    assert_eq!(engine.store().subscriptions().len(), 2);
}

#[test]
fn correlate_all_resumes_every_authorized_execution() {
    let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
    waiting_for(&engine, "alert");
    for id in ["pi-a", "pi-b"] {
        engine
            .store()
            .add_authorization(grant("kermit", Resource::ProcessInstance, id, Permission::Update));
    }

    let results = engine
        .runtime_service(Some(&kermit()))
        .create_message_correlation("alert")
        .set_variable("severity", json!("high"))
        .correlate_all()
        .unwrap();
    assert_eq!(results.len(), 2);

    let events = engine.store().received_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload, events[1].payload);
    for id in ["pi-a", "pi-b"] {
        assert_eq!(
            engine.store().execution(id).unwrap().variables.get("severity"),
            Some(&json!("high"))
        );
    }
}

#[test]
fn correlate_by_business_key_picks_one_instance() {
    let engine = ProcessEngine::builder().build().unwrap();
    let definition = deploy_invoice(&engine, 0);
    for (id, key) in [("pi-a", "order-1"), ("pi-b", "order-2")] {
        let instance = Execution::process_instance(&definition)
            .with_id(id)
            .with_business_key(key);
        engine.store().insert_subscription(EventSubscription::message(
            "paid",
            instance.id.clone(),
            instance.id.clone(),
            "receivePayment",
        ));
        engine.store().insert_execution(instance);
    }

    let result = engine
        .runtime_service(None)
        .correlate_message_with_business_key("paid", "order-2", VariableMap::new())
        .unwrap();
    assert!(result.is_execution());

    let events = engine.store().received_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].subscription.execution_id.as_deref(), Some("pi-b"));
}

#[test]
fn correlate_one_with_two_matches_is_a_cardinality_error() {
    let engine = ProcessEngine::builder().build().unwrap();
    waiting_for(&engine, "alert");

    let err = engine.runtime_service(None).correlate_message("alert").unwrap_err();
    assert!(matches!(err, EngineError::Cardinality { matches: 2, .. }));
    assert!(engine.store().received_events().is_empty());
}

#[test]
fn start_by_unknown_message_names_the_message() {
    let engine = ProcessEngine::builder().build().unwrap();

    let err = engine
        .runtime_service(None)
        .start_process_instance_by_message("startInvoiceMessage", None, VariableMap::new())
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("startInvoiceMessage"));
}

#[test]
fn start_by_message_creates_instance() {
    let engine = ProcessEngine::builder().build().unwrap();
    let definition = ProcessDefinition::new("order", 1).with_id("order:1");
    engine.store().deploy(definition);
    engine.store().insert_subscription(EventSubscription::message_start(
        "startOrder",
        "order:1",
        "orderReceived",
    ));

    let mut variables = VariableMap::new();
    variables.insert("amount".into(), json!(120));
    let instance = engine
        .runtime_service(None)
        .start_process_instance_by_message("startOrder", Some("order-77".into()), variables)
        .unwrap();

    assert_eq!(instance.process_definition_key, "order");
    assert_eq!(instance.business_key.as_deref(), Some("order-77"));
    assert_eq!(instance.variables.get("amount"), Some(&json!(120)));
    assert_eq!(engine.store().process_instances_of("order:1").len(), 1);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn cascade_writes_one_log_entry_for_any_instance_count(instances in 0usize..12) {
        let engine = ProcessEngine::builder().build().unwrap();
        deploy_invoice(&engine, instances);

        engine
            .repository_service(Some(&kermit()))
            .suspend_process_definition_by_id("invoice:1", true, None)
            .unwrap();

        prop_assert_eq!(engine.store().operation_log().len(), 1);
        let states = instance_states(&engine);
        prop_assert_eq!(states.len(), instances);
        prop_assert!(states.iter().all(|s| *s == SuspensionState::Suspended));
        prop_assert!(job_states(&engine).iter().all(|s| *s == SuspensionState::Suspended));
    }
}
