//! Task service

use super::ServiceContext;
use bpm_authz::query_param;
use bpm_command::{Command, CommandContext, TaskQuery};
use bpm_types::operation_log::{entity_type, operation_type};
use bpm_types::{
    ensure_not_null, EngineError, EngineResult, Permission, PropertyChange, Resource, Task,
    UserOperationLogEntry,
};
use tracing::debug;

/// Load a task for a mutating command; the lookup itself is not authorized.
fn find_task(ctx: &CommandContext, task_id: Option<&str>) -> EngineResult<Task> {
    let task_id = ensure_not_null("taskId", task_id)?;
    ctx.run_without_authentication(|| ctx.runtime_store().find_task_by_id(task_id))?
        .ok_or_else(|| {
            EngineError::not_found_with("task", task_id, format!("Cannot find task with id {task_id}"))
        })
}

fn task_log_entry(operation: &str, task: &Task, change: PropertyChange) -> UserOperationLogEntry {
    let mut entry = UserOperationLogEntry::new(operation, entity_type::TASK).with_property_change(change);
    entry.task_id = Some(task.id.clone());
    entry.process_instance_id = task.process_instance_id.clone();
    entry.process_definition_id = task.process_definition_id.clone();
    entry.process_definition_key = task.process_definition_key.clone();
    entry
}

/// Hand a task to another user, keeping the original assignee as owner.
///
/// A missing user id is rejected as a validation error rather than clearing
/// the assignee, so delegating always names the delegate.
#[derive(Debug, Clone)]
pub struct DelegateTaskCmd {
    task_id: Option<String>,
    user_id: Option<String>,
}

impl DelegateTaskCmd {
    pub fn new(task_id: Option<String>, user_id: Option<String>) -> Self {
        Self { task_id, user_id }
    }
}

impl Command<()> for DelegateTaskCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        let mut task = find_task(ctx, self.task_id.as_deref())?;
        let delegate = ensure_not_null("userId", self.user_id.clone())?;
        ctx.authorization_manager().check_update_task(&task)?;

        let previous = task.assignee.clone();
        task.delegate(&delegate);
        ctx.runtime_store().update_task(task.clone())?;
        debug!(task_id = %task.id, assignee = %delegate, "Delegated task");

        ctx.log_user_operation(task_log_entry(
            operation_type::DELEGATE,
            &task,
            PropertyChange::new("delegation", previous, Some(delegate)),
        ))
    }

    fn name(&self) -> &'static str {
        "DelegateTaskCmd"
    }
}

#[derive(Debug, Clone)]
pub struct SetTaskPriorityCmd {
    task_id: Option<String>,
    priority: i32,
}

impl SetTaskPriorityCmd {
    pub fn new(task_id: Option<String>, priority: i32) -> Self {
        Self { task_id, priority }
    }
}

impl Command<()> for SetTaskPriorityCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        let mut task = find_task(ctx, self.task_id.as_deref())?;
        ctx.authorization_manager().check_update_task(&task)?;

        let previous = task.priority;
        task.priority = self.priority;
        ctx.runtime_store().update_task(task.clone())?;

        ctx.log_user_operation(task_log_entry(
            operation_type::SET_PRIORITY,
            &task,
            PropertyChange::new(
                "priority",
                Some(previous.to_string()),
                Some(self.priority.to_string()),
            ),
        ))
    }

    fn name(&self) -> &'static str {
        "SetTaskPriorityCmd"
    }
}

/// Tasks visible to the subject.
///
/// A task is visible with READ on the task or READ_TASKS on its definition key.
#[derive(Debug, Clone, Default)]
pub struct TaskQueryCmd {
    query: TaskQuery,
}

impl TaskQueryCmd {
    pub fn new(query: TaskQuery) -> Self {
        Self { query }
    }
}

impl Command<Vec<Task>> for TaskQueryCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Vec<Task>> {
        let mut query = self.query.clone();
        let authorization = ctx.authorization_manager();
        authorization.configure_query(&mut query, Resource::Task);
        authorization.add_permission_check(
            &mut query,
            Permission::ReadTasks,
            Resource::ProcessDefinition,
            query_param::PROC_DEF_KEY,
        );
        ctx.runtime_store().select_tasks(&query)
    }

    fn name(&self) -> &'static str {
        "TaskQueryCmd"
    }
}

pub struct TaskService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> TaskService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn delegate_task(&self, task_id: impl Into<String>, user_id: impl Into<String>) -> EngineResult<()> {
        self.ctx.execute(&DelegateTaskCmd::new(
            Some(task_id.into()),
            Some(user_id.into()),
        ))
    }

    pub fn set_priority(&self, task_id: impl Into<String>, priority: i32) -> EngineResult<()> {
        self.ctx
            .execute(&SetTaskPriorityCmd::new(Some(task_id.into()), priority))
    }

    pub fn tasks(&self, query: TaskQuery) -> EngineResult<Vec<Task>> {
        self.ctx.execute(&TaskQueryCmd::new(query))
    }
}
