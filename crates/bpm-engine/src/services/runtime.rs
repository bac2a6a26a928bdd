//! Runtime service: messages, process instance suspension and queries

use super::suspension::UpdateSuspensionStateBuilder;
use super::ServiceContext;
use bpm_authz::query_param;
use bpm_command::{Command, CommandContext, ProcessInstanceQuery};
use bpm_correlation::{
    CorrelateAllMessageCmd, CorrelateMessageCmd, CorrelationHandler, MessageCorrelation,
    MessageCorrelationResult, MessageEventReceivedCmd, StartProcessInstanceByMessageCmd,
};
use bpm_suspension::SuspensionTarget;
use bpm_types::{EngineResult, Execution, Permission, Resource, VariableMap};
use std::sync::Arc;

/// Process instances visible to the subject.
///
/// A row is visible with READ on the instance or READ_INSTANCES on its
/// definition key.
#[derive(Debug, Clone, Default)]
pub struct ProcessInstanceQueryCmd {
    query: ProcessInstanceQuery,
}

impl ProcessInstanceQueryCmd {
    pub fn new(query: ProcessInstanceQuery) -> Self {
        Self { query }
    }
}

impl Command<Vec<Execution>> for ProcessInstanceQueryCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Vec<Execution>> {
        let mut query = self.query.clone();
        let authorization = ctx.authorization_manager();
        authorization.configure_query(&mut query, Resource::ProcessInstance);
        authorization.add_permission_check(
            &mut query,
            Permission::ReadInstances,
            Resource::ProcessDefinition,
            query_param::PROC_DEF_KEY,
        );
        ctx.runtime_store().select_process_instances(&query)
    }

    fn name(&self) -> &'static str {
        "ProcessInstanceQueryCmd"
    }
}

pub struct RuntimeService<'a> {
    ctx: ServiceContext<'a>,
    correlation_handler: Arc<dyn CorrelationHandler>,
}

impl<'a> RuntimeService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>, correlation_handler: Arc<dyn CorrelationHandler>) -> Self {
        Self {
            ctx,
            correlation_handler,
        }
    }

    /// Start building a correlation of message `message_name`
    pub fn create_message_correlation(&self, message_name: impl Into<String>) -> MessageCorrelationBuilder<'a> {
        MessageCorrelationBuilder {
            ctx: self.ctx.clone(),
            correlation_handler: self.correlation_handler.clone(),
            correlation: MessageCorrelation::new(message_name),
        }
    }

    /// Correlate on criteria only, whatever message the executions wait for
    pub fn create_correlation_without_name(&self) -> MessageCorrelationBuilder<'a> {
        MessageCorrelationBuilder {
            ctx: self.ctx.clone(),
            correlation_handler: self.correlation_handler.clone(),
            correlation: MessageCorrelation::without_name(),
        }
    }

    /// Deliver `message_name` to its single target
    pub fn correlate_message(&self, message_name: impl Into<String>) -> EngineResult<MessageCorrelationResult> {
        self.create_message_correlation(message_name).correlate()
    }

    pub fn correlate_message_with_business_key(
        &self,
        message_name: impl Into<String>,
        business_key: impl Into<String>,
        variables: VariableMap,
    ) -> EngineResult<MessageCorrelationResult> {
        self.create_message_correlation(message_name)
            .process_instance_business_key(business_key)
            .set_variables(variables)
            .correlate()
    }

    pub fn message_event_received(
        &self,
        message_name: impl Into<String>,
        execution_id: impl Into<String>,
        variables: Option<VariableMap>,
    ) -> EngineResult<()> {
        self.ctx.execute(&MessageEventReceivedCmd::new(
            Some(message_name.into()),
            Some(execution_id.into()),
            variables,
        ))
    }

    pub fn start_process_instance_by_message(
        &self,
        message_name: impl Into<String>,
        business_key: Option<String>,
        variables: VariableMap,
    ) -> EngineResult<Execution> {
        self.ctx.execute(&StartProcessInstanceByMessageCmd::new(
            Some(message_name.into()),
            business_key,
            variables,
        ))
    }

    pub fn update_process_instance_suspension_state(&self) -> UpdateSuspensionStateBuilder<'a> {
        UpdateSuspensionStateBuilder::new(self.ctx.clone(), SuspensionTarget::ProcessInstance)
    }

    pub fn suspend_process_instance_by_id(&self, process_instance_id: impl Into<String>) -> EngineResult<()> {
        self.update_process_instance_suspension_state()
            .by_id(process_instance_id)
            .suspend()
    }

    pub fn activate_process_instance_by_id(&self, process_instance_id: impl Into<String>) -> EngineResult<()> {
        self.update_process_instance_suspension_state()
            .by_id(process_instance_id)
            .activate()
    }

    pub fn suspend_process_instance_by_process_definition_key(&self, key: impl Into<String>) -> EngineResult<()> {
        self.update_process_instance_suspension_state()
            .by_process_definition_key(key)
            .suspend()
    }

    pub fn activate_process_instance_by_process_definition_key(&self, key: impl Into<String>) -> EngineResult<()> {
        self.update_process_instance_suspension_state()
            .by_process_definition_key(key)
            .activate()
    }

    pub fn process_instances(&self, query: ProcessInstanceQuery) -> EngineResult<Vec<Execution>> {
        self.ctx.execute(&ProcessInstanceQueryCmd::new(query))
    }
}

/// Fluent message correlation.
pub struct MessageCorrelationBuilder<'a> {
    ctx: ServiceContext<'a>,
    correlation_handler: Arc<dyn CorrelationHandler>,
    correlation: MessageCorrelation,
}

impl<'a> MessageCorrelationBuilder<'a> {
    pub fn process_instance_business_key(mut self, business_key: impl Into<String>) -> Self {
        self.correlation = self.correlation.process_instance_business_key(business_key);
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.correlation = self.correlation.process_instance_id(id);
        self
    }

    pub fn process_instance_variable_equals(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.correlation = self.correlation.process_instance_variable_equals(name, value);
        self
    }

    pub fn set_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.correlation = self.correlation.set_variable(name, value);
        self
    }

    pub fn set_variables(mut self, variables: VariableMap) -> Self {
        self.correlation = self.correlation.set_variables(variables);
        self
    }

    /// Deliver to exactly one target
    pub fn correlate(self) -> EngineResult<MessageCorrelationResult> {
        let command = CorrelateMessageCmd::new(self.correlation).with_handler(self.correlation_handler);
        self.ctx.execute(&command)
    }

    /// Deliver to every waiting execution and at most one new instance
    pub fn correlate_all(self) -> EngineResult<Vec<MessageCorrelationResult>> {
        let command = CorrelateAllMessageCmd::new(self.correlation).with_handler(self.correlation_handler);
        self.ctx.execute(&command)
    }
}
