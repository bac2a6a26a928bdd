//! Runtime queries
//!
//! Filter criteria are matched by [`RuntimeStore`](crate::RuntimeStore)
//! implementations through the `matches` helpers; the authorization part of a
//! query is configured by the authorization manager and applied per row.

use bpm_authz::{AuthorizationAware, QueryAuthorization};
use bpm_types::{EventSubscription, Execution, Job, SuspensionState, Task, VariableMap};

/// Query over process instances
#[derive(Debug, Clone, Default)]
pub struct ProcessInstanceQuery {
    pub process_instance_id: Option<String>,
    pub business_key: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub suspension_state: Option<SuspensionState>,
    pub authorization: QueryAuthorization,
}

impl ProcessInstanceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.process_instance_id = Some(id.into());
        self
    }

    pub fn business_key(mut self, business_key: impl Into<String>) -> Self {
        self.business_key = Some(business_key.into());
        self
    }

    pub fn process_definition_id(mut self, id: impl Into<String>) -> Self {
        self.process_definition_id = Some(id.into());
        self
    }

    pub fn process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.process_definition_key = Some(key.into());
        self
    }

    pub fn suspended(mut self) -> Self {
        self.suspension_state = Some(SuspensionState::Suspended);
        self
    }

    pub fn active(mut self) -> Self {
        self.suspension_state = Some(SuspensionState::Active);
        self
    }

    pub fn matches(&self, execution: &Execution) -> bool {
        execution.is_process_instance()
            && eq_opt(&self.process_instance_id, &execution.id)
            && eq_opt_opt(&self.business_key, &execution.business_key)
            && eq_opt(&self.process_definition_id, &execution.process_definition_id)
            && eq_opt(&self.process_definition_key, &execution.process_definition_key)
            && self
                .suspension_state
                .map_or(true, |s| s == execution.suspension_state)
    }
}

impl AuthorizationAware for ProcessInstanceQuery {
    fn authorization(&self) -> &QueryAuthorization {
        &self.authorization
    }

    fn authorization_mut(&mut self) -> &mut QueryAuthorization {
        &mut self.authorization
    }
}

/// Query over executions, as used by message correlation.
///
/// Business key and variables are matched against the owning process instance.
#[derive(Debug, Clone, Default)]
pub struct ExecutionQuery {
    pub process_instance_id: Option<String>,
    pub business_key: Option<String>,
    /// Only executions subscribed to this message
    pub message_event_subscription_name: Option<String>,
    /// Only executions subscribed to any message
    pub message_event_subscription: bool,
    /// Process variables that must be equal
    pub process_variables: VariableMap,
    /// Only executions that are not suspended
    pub active: bool,
}

impl ExecutionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `execution` qualifies, given its process instance and its subscriptions
    pub fn matches(
        &self,
        execution: &Execution,
        process_instance: &Execution,
        subscriptions: &[EventSubscription],
    ) -> bool {
        if !eq_opt(&self.process_instance_id, &execution.process_instance_id) {
            return false;
        }
        if !eq_opt_opt(&self.business_key, &process_instance.business_key) {
            return false;
        }
        if self.active && execution.is_suspended() {
            return false;
        }
        let variables_match = self
            .process_variables
            .iter()
            .all(|(name, value)| process_instance.variables.get(name) == Some(value));
        if !variables_match {
            return false;
        }
        let message_subscriptions = subscriptions
            .iter()
            .filter(|s| s.is_message() && s.execution_id.as_deref() == Some(execution.id.as_str()));
        match &self.message_event_subscription_name {
            Some(name) => message_subscriptions
                .into_iter()
                .any(|s| s.event_name.as_deref() == Some(name.as_str())),
            None if self.message_event_subscription => message_subscriptions.count() > 0,
            None => true,
        }
    }
}

/// Query over jobs
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub job_id: Option<String>,
    pub job_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub suspension_state: Option<SuspensionState>,
    pub authorization: QueryAuthorization,
}

impl JobQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(mut self, id: impl Into<String>) -> Self {
        self.job_id = Some(id.into());
        self
    }

    pub fn job_definition_id(mut self, id: impl Into<String>) -> Self {
        self.job_definition_id = Some(id.into());
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.process_instance_id = Some(id.into());
        self
    }

    pub fn process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.process_definition_key = Some(key.into());
        self
    }

    pub fn suspended(mut self) -> Self {
        self.suspension_state = Some(SuspensionState::Suspended);
        self
    }

    pub fn active(mut self) -> Self {
        self.suspension_state = Some(SuspensionState::Active);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        eq_opt(&self.job_id, &job.id)
            && eq_opt_opt(&self.job_definition_id, &job.job_definition_id)
            && eq_opt_opt(&self.process_instance_id, &job.process_instance_id)
            && eq_opt_opt(&self.process_definition_id, &job.process_definition_id)
            && eq_opt_opt(&self.process_definition_key, &job.process_definition_key)
            && self
                .suspension_state
                .map_or(true, |s| s == job.suspension_state)
    }
}

impl AuthorizationAware for JobQuery {
    fn authorization(&self) -> &QueryAuthorization {
        &self.authorization
    }

    fn authorization_mut(&mut self) -> &mut QueryAuthorization {
        &mut self.authorization
    }
}

/// Query over tasks
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub assignee: Option<String>,
    pub authorization: QueryAuthorization,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.process_instance_id = Some(id.into());
        self
    }

    pub fn task_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        eq_opt(&self.task_id, &task.id)
            && eq_opt_opt(&self.process_instance_id, &task.process_instance_id)
            && eq_opt_opt(&self.assignee, &task.assignee)
    }
}

impl AuthorizationAware for TaskQuery {
    fn authorization(&self) -> &QueryAuthorization {
        &self.authorization
    }

    fn authorization_mut(&mut self) -> &mut QueryAuthorization {
        &mut self.authorization
    }
}

fn eq_opt(criterion: &Option<String>, value: &str) -> bool {
    criterion.as_deref().map_or(true, |c| c == value)
}

fn eq_opt_opt(criterion: &Option<String>, value: &Option<String>) -> bool {
    match criterion {
        Some(c) => value.as_deref() == Some(c.as_str()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpm_types::{ProcessDefinition, SuspensionState};
    use serde_json::json;

    fn instance() -> Execution {
        Execution::process_instance(&ProcessDefinition::new("order", 1))
            .with_id("pi-1")
            .with_business_key("order-42")
            .with_variable("customer", json!("acme"))
    }

    #[test]
    fn test_execution_query_matches_on_instance_data() {
        let pi = instance();
        let waiting = Execution::child_of(&pi).with_activity("waitForPayment");
        let subscriptions = vec![EventSubscription::message(
            "paymentReceived",
            waiting.id.clone(),
            "pi-1",
            "waitForPayment",
        )];

        let mut query = ExecutionQuery::new();
        query.message_event_subscription_name = Some("paymentReceived".into());
        query.business_key = Some("order-42".into());
        query.process_variables.insert("customer".into(), json!("acme"));
        query.active = true;
        assert!(query.matches(&waiting, &pi, &subscriptions));

        // the instance itself holds no subscription
        assert!(!query.matches(&pi, &pi, &subscriptions));

        query.process_variables.insert("customer".into(), json!("globex"));
        assert!(!query.matches(&waiting, &pi, &subscriptions));
    }

    #[test]
    fn test_execution_query_skips_suspended_when_active() {
        let pi = instance();
        let mut waiting = Execution::child_of(&pi);
        waiting.suspension_state = SuspensionState::Suspended;
        let subscriptions = vec![EventSubscription::message("alert", waiting.id.clone(), "pi-1", "a")];

        let mut query = ExecutionQuery::new();
        query.message_event_subscription = true;
        assert!(query.matches(&waiting, &pi, &subscriptions));
        query.active = true;
        assert!(!query.matches(&waiting, &pi, &subscriptions));
    }

    #[test]
    fn test_job_query() {
        let mut job = Job::new().with_id("j1");
        job.process_definition_key = Some("order".into());
        assert!(JobQuery::new().process_definition_key("order").matches(&job));
        assert!(!JobQuery::new().job_definition_id("jd").matches(&job));
        assert!(JobQuery::new().active().matches(&job));
        assert!(!JobQuery::new().suspended().matches(&job));
    }
}
