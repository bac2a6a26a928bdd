//! In-memory storage gateway
//!
//! All engine data lives in one [`MemoryState`] behind a lock. A unit of work
//! takes a snapshot before it runs and puts it back if the work fails, so a
//! failed command leaves no trace. Units of work are serialized; plain reads
//! from other threads see the latest committed or in-flight state.

use bpm_authz::{evaluator, AuthorizationCheck, AuthorizationQuery, AuthorizationStore};
use bpm_command::{
    CommandSettings, DeferredJob, EngineServices, ExecutionQuery, JobHandlerRegistry, JobQuery,
    JobScheduler, OperationLogSink, ProcessInstanceQuery, RuntimeStore, SuspensionSelector,
    SuspensionTarget, TaskQuery, UnitOfWork,
};
use bpm_types::{
    Authorization, EngineError, EngineResult, EventSubscription, EventType, Execution, Job,
    JobDefinition, ProcessDefinition, Resource, SuspensionState, Task, UserOperationLogEntry,
    VariableMap,
};
use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An event handed to a waiting execution
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub subscription: EventSubscription,
    pub payload: Option<VariableMap>,
}

/// Everything the store holds, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub authorizations: BTreeMap<String, Authorization>,
    pub process_definitions: BTreeMap<String, ProcessDefinition>,
    pub executions: BTreeMap<String, Execution>,
    pub job_definitions: BTreeMap<String, JobDefinition>,
    pub jobs: BTreeMap<String, Job>,
    pub tasks: BTreeMap<String, Task>,
    pub subscriptions: BTreeMap<String, EventSubscription>,
    pub deferred_jobs: BTreeMap<String, DeferredJob>,
    pub operation_log: Vec<UserOperationLogEntry>,
    pub received_events: Vec<ReceivedEvent>,
}

impl MemoryState {
    fn grants(&self) -> Vec<Authorization> {
        self.authorizations.values().cloned().collect()
    }
}

/// Engine storage held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    unit_of_work: ReentrantMutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Wire this store into every storage-backed collaborator slot
    pub fn engine_services(
        self: &Arc<Self>,
        settings: CommandSettings,
        job_handlers: JobHandlerRegistry,
    ) -> EngineServices {
        EngineServices {
            settings,
            authorization_store: self.clone(),
            runtime_store: self.clone(),
            unit_of_work: self.clone(),
            scheduler: self.clone(),
            operation_log: self.clone(),
            process_runtime: self.clone(),
            job_handlers,
        }
    }

    // ---- seeding ----

    pub fn deploy(&self, definition: ProcessDefinition) {
        self.state
            .write()
            .process_definitions
            .insert(definition.id.clone(), definition);
    }

    pub fn insert_execution(&self, execution: Execution) {
        self.state
            .write()
            .executions
            .insert(execution.id.clone(), execution);
    }

    pub fn insert_job_definition(&self, job_definition: JobDefinition) {
        self.state
            .write()
            .job_definitions
            .insert(job_definition.id.clone(), job_definition);
    }

    pub fn insert_job(&self, job: Job) {
        self.state.write().jobs.insert(job.id.clone(), job);
    }

    pub fn insert_task(&self, task: Task) {
        self.state.write().tasks.insert(task.id.clone(), task);
    }

    pub fn insert_subscription(&self, subscription: EventSubscription) {
        self.state
            .write()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn add_authorization(&self, authorization: Authorization) {
        self.state
            .write()
            .authorizations
            .insert(authorization.id.clone(), authorization);
    }

    pub fn remove_job(&self, id: &str) -> Option<Job> {
        self.state.write().jobs.remove(id)
    }

    pub fn remove_process_definition(&self, id: &str) -> Option<ProcessDefinition> {
        self.state.write().process_definitions.remove(id)
    }

    // ---- inspection ----

    pub fn process_definition(&self, id: &str) -> Option<ProcessDefinition> {
        self.state.read().process_definitions.get(id).cloned()
    }

    pub fn execution(&self, id: &str) -> Option<Execution> {
        self.state.read().executions.get(id).cloned()
    }

    pub fn job_definition(&self, id: &str) -> Option<JobDefinition> {
        self.state.read().job_definitions.get(id).cloned()
    }

    pub fn job(&self, id: &str) -> Option<Job> {
        self.state.read().jobs.get(id).cloned()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state.read().tasks.get(id).cloned()
    }

    /// Jobs matching the query's filter criteria, ignoring its authorization part
    pub fn jobs(&self, query: &JobQuery) -> Vec<Job> {
        self.state
            .read()
            .jobs
            .values()
            .filter(|j| query.matches(j))
            .cloned()
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<EventSubscription> {
        self.state.read().subscriptions.values().cloned().collect()
    }

    pub fn deferred_jobs(&self) -> Vec<DeferredJob> {
        let mut jobs: Vec<DeferredJob> = self.state.read().deferred_jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        jobs
    }

    pub fn operation_log(&self) -> Vec<UserOperationLogEntry> {
        self.state.read().operation_log.clone()
    }

    pub fn received_events(&self) -> Vec<ReceivedEvent> {
        self.state.read().received_events.clone()
    }

    /// Process instances of `process_definition_id`
    pub fn process_instances_of(&self, process_definition_id: &str) -> Vec<Execution> {
        self.state
            .read()
            .executions
            .values()
            .filter(|e| e.is_process_instance() && e.process_definition_id == process_definition_id)
            .cloned()
            .collect()
    }

    pub(crate) fn state(&self) -> &RwLock<MemoryState> {
        &self.state
    }
}

impl UnitOfWork for InMemoryStore {
    fn run(&self, work: &mut dyn FnMut() -> EngineResult<()>) -> EngineResult<()> {
        let _serialized = self.unit_of_work.lock();
        let snapshot = self.state.read().clone();
        let result = work();
        if result.is_err() {
            *self.state.write() = snapshot;
            debug!("Unit of work rolled back");
        }
        result
    }
}

impl AuthorizationStore for InMemoryStore {
    fn insert_authorization(&self, authorization: Authorization) -> EngineResult<()> {
        let mut state = self.state.write();
        if state.authorizations.contains_key(&authorization.id) {
            return Err(EngineError::Storage(format!(
                "Authorization with id '{}' already exists",
                authorization.id
            )));
        }
        state
            .authorizations
            .insert(authorization.id.clone(), authorization);
        Ok(())
    }

    fn update_authorization(&self, authorization: Authorization) -> EngineResult<()> {
        let mut state = self.state.write();
        match state.authorizations.get_mut(&authorization.id) {
            Some(existing) => {
                *existing = authorization;
                Ok(())
            }
            None => Err(EngineError::not_found("authorization", authorization.id)),
        }
    }

    fn delete_authorization(&self, id: &str) -> EngineResult<Option<Authorization>> {
        Ok(self.state.write().authorizations.remove(id))
    }

    fn find_authorization_by_id(&self, id: &str) -> EngineResult<Option<Authorization>> {
        Ok(self.state.read().authorizations.get(id).cloned())
    }

    fn select_authorizations(&self, query: &AuthorizationQuery) -> EngineResult<Vec<Authorization>> {
        let state = self.state.read();
        let grants = state.grants();
        Ok(state
            .authorizations
            .values()
            .filter(|a| query.matches(a))
            .filter(|a| query.authorization.is_visible(&grants, *a))
            .cloned()
            .collect())
    }

    fn delete_authorizations_by_resource_id(
        &self,
        resource: Resource,
        resource_id: &str,
    ) -> EngineResult<usize> {
        let mut state = self.state.write();
        let before = state.authorizations.len();
        state.authorizations.retain(|_, a| {
            !(a.resource == resource && a.resource_id.as_str() == resource_id)
        });
        Ok(before - state.authorizations.len())
    }

    fn is_user_authorized(&self, check: &AuthorizationCheck) -> EngineResult<bool> {
        let state = self.state.read();
        let grants: Vec<Authorization> = state.authorizations.values().cloned().collect();
        Ok(evaluator::evaluate(&grants, check))
    }
}

impl RuntimeStore for InMemoryStore {
    fn find_process_definition_by_id(&self, id: &str) -> EngineResult<Option<ProcessDefinition>> {
        Ok(self.process_definition(id))
    }

    fn find_latest_process_definition_by_key(
        &self,
        key: &str,
    ) -> EngineResult<Option<ProcessDefinition>> {
        Ok(self
            .state
            .read()
            .process_definitions
            .values()
            .filter(|d| d.key == key)
            .max_by_key(|d| d.version)
            .cloned())
    }

    fn find_execution_by_id(&self, id: &str) -> EngineResult<Option<Execution>> {
        Ok(self.execution(id))
    }

    fn select_executions(&self, query: &ExecutionQuery) -> EngineResult<Vec<Execution>> {
        let state = self.state.read();
        let subscriptions: Vec<EventSubscription> = state.subscriptions.values().cloned().collect();
        Ok(state
            .executions
            .values()
            .filter(|e| {
                state
                    .executions
                    .get(&e.process_instance_id)
                    .map_or(false, |pi| query.matches(e, pi, &subscriptions))
            })
            .cloned()
            .collect())
    }

    fn select_process_instances(&self, query: &ProcessInstanceQuery) -> EngineResult<Vec<Execution>> {
        let state = self.state.read();
        let grants = state.grants();
        Ok(state
            .executions
            .values()
            .filter(|e| query.matches(e))
            .filter(|e| query.authorization.is_visible(&grants, *e))
            .cloned()
            .collect())
    }

    fn find_job_by_id(&self, id: &str) -> EngineResult<Option<Job>> {
        Ok(self.job(id))
    }

    fn find_job_definition_by_id(&self, id: &str) -> EngineResult<Option<JobDefinition>> {
        Ok(self.job_definition(id))
    }

    fn select_jobs(&self, query: &JobQuery) -> EngineResult<Vec<Job>> {
        let state = self.state.read();
        let grants = state.grants();
        Ok(state
            .jobs
            .values()
            .filter(|j| query.matches(j))
            .filter(|j| query.authorization.is_visible(&grants, *j))
            .cloned()
            .collect())
    }

    fn find_task_by_id(&self, id: &str) -> EngineResult<Option<Task>> {
        Ok(self.task(id))
    }

    fn update_task(&self, task: Task) -> EngineResult<()> {
        let mut state = self.state.write();
        match state.tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task;
                Ok(())
            }
            None => Err(EngineError::not_found("task", task.id)),
        }
    }

    fn select_tasks(&self, query: &TaskQuery) -> EngineResult<Vec<Task>> {
        let state = self.state.read();
        let grants = state.grants();
        Ok(state
            .tasks
            .values()
            .filter(|t| query.matches(t))
            // case tasks carry no process authorization
            .filter(|t| t.case_execution_id.is_some() || query.authorization.is_visible(&grants, *t))
            .cloned()
            .collect())
    }

    fn find_message_start_subscription_by_name(
        &self,
        name: &str,
    ) -> EngineResult<Option<EventSubscription>> {
        Ok(self
            .state
            .read()
            .subscriptions
            .values()
            .filter(|s| s.is_message() && s.is_start_event())
            .filter(|s| s.event_name.as_deref() == Some(name))
            .max_by_key(|s| s.created)
            .cloned())
    }

    fn find_event_subscriptions_by_execution(
        &self,
        execution_id: &str,
        event_type: EventType,
        event_name: Option<&str>,
    ) -> EngineResult<Vec<EventSubscription>> {
        Ok(self
            .state
            .read()
            .subscriptions
            .values()
            .filter(|s| s.event_type == event_type)
            .filter(|s| s.execution_id.as_deref() == Some(execution_id))
            .filter(|s| event_name.map_or(true, |name| s.event_name.as_deref() == Some(name)))
            .cloned()
            .collect())
    }

    fn suspension_state(
        &self,
        target: SuspensionTarget,
        id: &str,
    ) -> EngineResult<Option<SuspensionState>> {
        let state = self.state.read();
        Ok(match target {
            SuspensionTarget::ProcessDefinition => {
                state.process_definitions.get(id).map(|d| d.suspension_state)
            }
            SuspensionTarget::ProcessInstance => state
                .executions
                .get(id)
                .filter(|e| e.is_process_instance())
                .map(|e| e.suspension_state),
            SuspensionTarget::JobDefinition => {
                state.job_definitions.get(id).map(|d| d.suspension_state)
            }
            SuspensionTarget::Job => state.jobs.get(id).map(|j| j.suspension_state),
        })
    }

    fn update_suspension_state(
        &self,
        target: SuspensionTarget,
        selector: &SuspensionSelector,
        new_state: SuspensionState,
    ) -> EngineResult<usize> {
        let mut state = self.state.write();
        let updated = match target {
            SuspensionTarget::ProcessDefinition => update_process_definitions(&mut state, selector, new_state)?,
            SuspensionTarget::ProcessInstance => update_process_instances(&mut state, selector, new_state)?,
            SuspensionTarget::JobDefinition => update_job_definitions(&mut state, selector, new_state)?,
            SuspensionTarget::Job => update_jobs(&mut state, selector, new_state),
        };
        debug!(%target, ?selector, state = %new_state, updated, "Suspension state stored");
        Ok(updated)
    }
}

fn unsupported(target: SuspensionTarget, selector: &SuspensionSelector) -> EngineError {
    EngineError::Validation(format!("Cannot select {} by {:?}", target, selector))
}

fn update_process_definitions(
    state: &mut MemoryState,
    selector: &SuspensionSelector,
    new_state: SuspensionState,
) -> EngineResult<usize> {
    let mut updated = 0;
    for definition in state.process_definitions.values_mut() {
        let selected = match selector {
            SuspensionSelector::Id(id) => &definition.id == id,
            SuspensionSelector::ProcessDefinitionKey(key) => &definition.key == key,
            other => return Err(unsupported(SuspensionTarget::ProcessDefinition, other)),
        };
        if selected {
            definition.suspension_state = new_state;
            updated += 1;
        }
    }
    Ok(updated)
}

fn update_process_instances(
    state: &mut MemoryState,
    selector: &SuspensionSelector,
    new_state: SuspensionState,
) -> EngineResult<usize> {
    if let SuspensionSelector::JobDefinitionId(_) = selector {
        return Err(unsupported(SuspensionTarget::ProcessInstance, selector));
    }
    let instance_ids: Vec<String> = state
        .executions
        .values()
        .filter(|e| e.is_process_instance())
        .filter(|e| match selector {
            SuspensionSelector::Id(id) | SuspensionSelector::ProcessInstanceId(id) => &e.id == id,
            SuspensionSelector::ProcessDefinitionId(id) => &e.process_definition_id == id,
            SuspensionSelector::ProcessDefinitionKey(key) => &e.process_definition_key == key,
            SuspensionSelector::JobDefinitionId(_) => false,
        })
        .map(|e| e.id.clone())
        .collect();

    for execution in state.executions.values_mut() {
        if instance_ids.contains(&execution.process_instance_id) {
            execution.suspension_state = new_state;
        }
    }
    for task in state.tasks.values_mut() {
        if task
            .process_instance_id
            .as_ref()
            .map_or(false, |id| instance_ids.contains(id))
        {
            task.suspension_state = new_state;
        }
    }
    Ok(instance_ids.len())
}

fn update_job_definitions(
    state: &mut MemoryState,
    selector: &SuspensionSelector,
    new_state: SuspensionState,
) -> EngineResult<usize> {
    let mut updated = 0;
    for definition in state.job_definitions.values_mut() {
        let selected = match selector {
            SuspensionSelector::Id(id) | SuspensionSelector::JobDefinitionId(id) => &definition.id == id,
            SuspensionSelector::ProcessDefinitionId(id) => &definition.process_definition_id == id,
            SuspensionSelector::ProcessDefinitionKey(key) => &definition.process_definition_key == key,
            other => return Err(unsupported(SuspensionTarget::JobDefinition, other)),
        };
        if selected {
            definition.suspension_state = new_state;
            updated += 1;
        }
    }
    Ok(updated)
}

fn update_jobs(state: &mut MemoryState, selector: &SuspensionSelector, new_state: SuspensionState) -> usize {
    let mut updated = 0;
    for job in state.jobs.values_mut() {
        let value = Some(selector.value());
        let selected = match selector {
            SuspensionSelector::Id(id) => &job.id == id,
            SuspensionSelector::JobDefinitionId(_) => job.job_definition_id.as_deref() == value,
            SuspensionSelector::ProcessInstanceId(_) => job.process_instance_id.as_deref() == value,
            SuspensionSelector::ProcessDefinitionId(_) => job.process_definition_id.as_deref() == value,
            SuspensionSelector::ProcessDefinitionKey(_) => job.process_definition_key.as_deref() == value,
        };
        if selected {
            job.suspension_state = new_state;
            updated += 1;
        }
    }
    updated
}

impl JobScheduler for InMemoryStore {
    fn schedule(&self, job: DeferredJob) -> EngineResult<()> {
        self.state.write().deferred_jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn acquire_due_jobs(&self, now: DateTime<Utc>, max_jobs: usize) -> EngineResult<Vec<DeferredJob>> {
        let mut due: Vec<DeferredJob> = self
            .state
            .read()
            .deferred_jobs
            .values()
            .filter(|j| j.is_due(now) && j.retries > 0)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        due.truncate(max_jobs);
        Ok(due)
    }

    fn delete_job(&self, job_id: &str) -> EngineResult<()> {
        self.state.write().deferred_jobs.remove(job_id);
        Ok(())
    }

    fn record_failure(&self, job_id: &str, message: &str) -> EngineResult<u32> {
        let mut state = self.state.write();
        let job = state
            .deferred_jobs
            .get_mut(job_id)
            .ok_or_else(|| EngineError::not_found("job", job_id))?;
        job.retries = job.retries.saturating_sub(1);
        job.exception_message = Some(message.to_string());
        Ok(job.retries)
    }

    fn find_jobs_by_handler_type(&self, handler_type: &str) -> EngineResult<Vec<DeferredJob>> {
        Ok(self
            .state
            .read()
            .deferred_jobs
            .values()
            .filter(|j| j.handler_type == handler_type)
            .cloned()
            .collect())
    }

    fn find_failed_jobs(&self) -> EngineResult<Vec<DeferredJob>> {
        let mut failed: Vec<DeferredJob> = self
            .state
            .read()
            .deferred_jobs
            .values()
            .filter(|j| j.is_failed())
            .cloned()
            .collect();
        failed.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(failed)
    }

    fn set_job_retries(&self, job_id: &str, retries: u32) -> EngineResult<()> {
        let mut state = self.state.write();
        let job = state
            .deferred_jobs
            .get_mut(job_id)
            .ok_or_else(|| EngineError::not_found("job", job_id))?;
        job.retries = retries;
        Ok(())
    }
}

impl OperationLogSink for InMemoryStore {
    fn log_user_operation(&self, entry: UserOperationLogEntry) -> EngineResult<()> {
        self.state.write().operation_log.push(entry);
        Ok(())
    }
}
