//! Message commands
//!
//! Correlation runs in three phases: a privilege-neutral lookup, an
//! authorization pass over every result, then dispatch. Nothing is dispatched
//! unless every result is authorized, so a rejected correlation leaves all
//! executions untouched.

use crate::correlation::{MessageCorrelation, MessageCorrelationResult};
use crate::handler::{CorrelationHandler, DefaultCorrelationHandler};
use bpm_command::{Command, CommandContext};
use bpm_types::{
    ensure_not_null, EngineError, EngineResult, EventType, Execution, VariableMap,
};
use std::sync::Arc;
use tracing::{debug, info};

fn default_handler() -> Arc<dyn CorrelationHandler> {
    Arc::new(DefaultCorrelationHandler)
}

/// Check the subject may act on `result`.
pub fn authorize(ctx: &CommandContext, result: &MessageCorrelationResult) -> EngineResult<()> {
    let authorization = ctx.authorization_manager();
    match result {
        MessageCorrelationResult::Execution { execution, .. } => authorization
            .check_update_process_instance(&execution.process_instance_id, &execution.process_definition_key),
        MessageCorrelationResult::ProcessDefinition { definition, .. } => {
            authorization.check_create_process_instance(&definition.key)
        }
    }
}

/// Resume the execution or start the instance; returns the execution acted on.
pub fn dispatch(
    ctx: &CommandContext,
    correlation: &MessageCorrelation,
    result: &MessageCorrelationResult,
) -> EngineResult<Execution> {
    let runtime = ctx.process_runtime();
    match result {
        MessageCorrelationResult::Execution {
            execution,
            subscription,
        } => {
            runtime.event_received(subscription, correlation.payload())?;
            Ok(execution.clone())
        }
        MessageCorrelationResult::ProcessDefinition {
            definition,
            start_activity_id,
        } => runtime.start_process_instance(
            definition,
            correlation.correlation_set.business_key.as_deref(),
            start_activity_id.as_deref(),
            correlation.process_variables.clone(),
        ),
    }
}

/// Deliver a message to exactly one target.
pub struct CorrelateMessageCmd {
    correlation: MessageCorrelation,
    handler: Arc<dyn CorrelationHandler>,
}

impl CorrelateMessageCmd {
    pub fn new(correlation: MessageCorrelation) -> Self {
        Self {
            correlation,
            handler: default_handler(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn CorrelationHandler>) -> Self {
        self.handler = handler;
        self
    }

    fn cardinality_error(&self, matches: usize) -> EngineError {
        let name = self.correlation.message_name();
        let display_name = name.unwrap_or("null");
        let message = if matches == 0 {
            format!(
                "Cannot correlate message '{}': no process definition or execution matches the parameters",
                display_name
            )
        } else {
            format!(
                "Cannot correlate a message with name '{}' to a single execution. {} executions match the correlation keys: {}",
                display_name, matches, self.correlation.correlation_set
            )
        };
        EngineError::cardinality(name, matches, message)
    }
}

impl Command<MessageCorrelationResult> for CorrelateMessageCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<MessageCorrelationResult> {
        self.correlation.validate()?;
        let name = self.correlation.message_name();
        let set = &self.correlation.correlation_set;

        let mut candidates = ctx.run_without_authentication(|| -> EngineResult<Vec<_>> {
            let executions = self.handler.correlate_executions(ctx, name, set)?;
            if !executions.is_empty() {
                return Ok(executions);
            }
            Ok(self
                .handler
                .correlate_start_message(ctx, name, set)?
                .into_iter()
                .collect())
        })?;

        // every candidate must be authorized, even when there are too many
        for candidate in &candidates {
            authorize(ctx, candidate)?;
        }

        if candidates.len() != 1 {
            return Err(self.cardinality_error(candidates.len()));
        }
        let result = candidates.remove(0);
        let target = dispatch(ctx, &self.correlation, &result)?;
        info!(
            message_name = name,
            execution_id = %target.id,
            started = !result.is_execution(),
            "Message correlated"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "CorrelateMessageCmd"
    }
}

/// Deliver a message to every waiting execution and at most one new instance.
pub struct CorrelateAllMessageCmd {
    correlation: MessageCorrelation,
    handler: Arc<dyn CorrelationHandler>,
}

impl CorrelateAllMessageCmd {
    pub fn new(correlation: MessageCorrelation) -> Self {
        Self {
            correlation,
            handler: default_handler(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn CorrelationHandler>) -> Self {
        self.handler = handler;
        self
    }
}

impl Command<Vec<MessageCorrelationResult>> for CorrelateAllMessageCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Vec<MessageCorrelationResult>> {
        self.correlation.validate()?;
        let name = self.correlation.message_name();
        let set = &self.correlation.correlation_set;

        let results = ctx.run_without_authentication(|| {
            let mut results = self.handler.correlate_executions(ctx, name, set)?;
            results.extend(self.handler.correlate_start_message(ctx, name, set)?);
            Ok::<_, EngineError>(results)
        })?;

        for result in &results {
            authorize(ctx, result)?;
        }
        for result in &results {
            dispatch(ctx, &self.correlation, result)?;
        }
        info!(message_name = name, matches = results.len(), "Message correlated to all matches");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "CorrelateAllMessageCmd"
    }
}

/// Deliver a message to one specific execution.
#[derive(Debug, Clone)]
pub struct MessageEventReceivedCmd {
    message_name: Option<String>,
    execution_id: Option<String>,
    process_variables: Option<VariableMap>,
}

impl MessageEventReceivedCmd {
    pub fn new(
        message_name: Option<String>,
        execution_id: Option<String>,
        process_variables: Option<VariableMap>,
    ) -> Self {
        Self {
            message_name,
            execution_id,
            process_variables,
        }
    }
}

impl Command<()> for MessageEventReceivedCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<()> {
        let execution_id = ensure_not_null("executionId", self.execution_id.as_deref())?;
        let message_name = self.message_name.as_deref();

        let mut subscriptions = ctx.run_without_authentication(|| {
            ctx.runtime_store()
                .find_event_subscriptions_by_execution(execution_id, EventType::Message, message_name)
        })?;

        if subscriptions.is_empty() {
            return Err(EngineError::not_found_with(
                "event subscription",
                execution_id,
                format!(
                    "Execution with id '{}' does not have a subscription to a message event with name '{}'",
                    execution_id,
                    message_name.unwrap_or("null")
                ),
            ));
        }
        if subscriptions.len() > 1 {
            return Err(EngineError::cardinality(
                message_name,
                subscriptions.len(),
                format!("More than one matching message subscription found for execution {}", execution_id),
            ));
        }
        let subscription = subscriptions.remove(0);

        let process_instance_id = subscription
            .process_instance_id
            .as_deref()
            .ok_or_else(|| EngineError::not_found("process instance", execution_id))?;
        ctx.run_without_authentication(|| ctx.runtime_store().find_execution_by_id(process_instance_id))?
            .ok_or_else(|| EngineError::not_found("process instance", process_instance_id))
            .and_then(|instance| {
                ctx.authorization_manager().check_update_process_instance(
                    &instance.process_instance_id,
                    &instance.process_definition_key,
                )
            })?;

        debug!(execution_id, subscription_id = %subscription.id, "Message event received");
        ctx.process_runtime()
            .event_received(&subscription, self.process_variables.clone())
    }

    fn name(&self) -> &'static str {
        "MessageEventReceivedCmd"
    }
}

/// Start a new process instance through a message start event.
#[derive(Debug, Clone)]
pub struct StartProcessInstanceByMessageCmd {
    message_name: Option<String>,
    business_key: Option<String>,
    process_variables: VariableMap,
}

impl StartProcessInstanceByMessageCmd {
    pub fn new(
        message_name: Option<String>,
        business_key: Option<String>,
        process_variables: VariableMap,
    ) -> Self {
        Self {
            message_name,
            business_key,
            process_variables,
        }
    }
}

impl Command<Execution> for StartProcessInstanceByMessageCmd {
    fn execute(&self, ctx: &CommandContext) -> EngineResult<Execution> {
        let message_name = self.message_name.as_deref().ok_or_else(|| {
            EngineError::Validation("Cannot start process instance by message: message name is null".into())
        })?;

        let subscription = ctx
            .run_without_authentication(|| {
                ctx.runtime_store()
                    .find_message_start_subscription_by_name(message_name)
            })?
            .ok_or_else(|| {
                EngineError::not_found_with(
                    "message start event subscription",
                    message_name,
                    format!(
                        "Cannot start process instance by message: no subscription to message with name '{}' found",
                        message_name
                    ),
                )
            })?;

        let definition_id = subscription.configuration.as_deref().ok_or_else(|| {
            EngineError::Validation(format!(
                "Cannot start process instance by message: subscription to message with name '{}' is not a message start event",
                message_name
            ))
        })?;

        let definition = ctx
            .run_without_authentication(|| {
                ctx.runtime_store().find_process_definition_by_id(definition_id)
            })?
            .ok_or_else(|| {
                EngineError::not_found_with(
                    "process definition",
                    definition_id,
                    format!("No process definition found for id '{}'", definition_id),
                )
            })?;

        ctx.authorization_manager()
            .check_create_process_instance(&definition.key)?;

        let instance = ctx.process_runtime().start_process_instance(
            &definition,
            self.business_key.as_deref(),
            subscription.activity_id.as_deref(),
            self.process_variables.clone(),
        )?;
        info!(
            message_name,
            process_instance_id = %instance.id,
            process_definition_id = %definition.id,
            "Process instance started by message"
        );
        Ok(instance)
    }

    fn name(&self) -> &'static str {
        "StartProcessInstanceByMessageCmd"
    }
}
