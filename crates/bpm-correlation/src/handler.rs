//! Correlation lookup
//!
//! A [`CorrelationHandler`] finds the targets of a message. It runs without
//! authentication and decides nothing about permissions; the commands in
//! [`crate::command`] authorize every result before dispatching any.

use crate::correlation::{CorrelationSet, MessageCorrelationResult};
use bpm_command::{CommandContext, ExecutionQuery};
use bpm_types::{EngineResult, EventType};
use tracing::debug;

pub trait CorrelationHandler: Send + Sync {
    /// Waiting executions the message can be delivered to
    fn correlate_executions(
        &self,
        ctx: &CommandContext,
        message_name: Option<&str>,
        correlation_set: &CorrelationSet,
    ) -> EngineResult<Vec<MessageCorrelationResult>>;

    /// The message start event that can be triggered, if any
    fn correlate_start_message(
        &self,
        ctx: &CommandContext,
        message_name: Option<&str>,
        correlation_set: &CorrelationSet,
    ) -> EngineResult<Option<MessageCorrelationResult>>;
}

/// Matches executions through an [`ExecutionQuery`] and start events by message name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCorrelationHandler;

impl CorrelationHandler for DefaultCorrelationHandler {
    fn correlate_executions(
        &self,
        ctx: &CommandContext,
        message_name: Option<&str>,
        correlation_set: &CorrelationSet,
    ) -> EngineResult<Vec<MessageCorrelationResult>> {
        let query = ExecutionQuery {
            process_instance_id: correlation_set.process_instance_id.clone(),
            business_key: correlation_set.business_key.clone(),
            message_event_subscription_name: message_name.map(str::to_string),
            message_event_subscription: message_name.is_none(),
            process_variables: correlation_set.correlation_keys.clone(),
            active: true,
        };

        let store = ctx.runtime_store();
        let mut results = Vec::new();
        for execution in store.select_executions(&query)? {
            let subscription = store
                .find_event_subscriptions_by_execution(&execution.id, EventType::Message, message_name)?
                .into_iter()
                .next();
            if let Some(subscription) = subscription {
                results.push(MessageCorrelationResult::Execution {
                    execution,
                    subscription,
                });
            }
        }
        debug!(message_name, matches = results.len(), "Executions correlated");
        Ok(results)
    }

    fn correlate_start_message(
        &self,
        ctx: &CommandContext,
        message_name: Option<&str>,
        correlation_set: &CorrelationSet,
    ) -> EngineResult<Option<MessageCorrelationResult>> {
        // a process instance id always addresses an existing instance
        let name = match (message_name, &correlation_set.process_instance_id) {
            (Some(name), None) => name,
            _ => return Ok(None),
        };

        let store = ctx.runtime_store();
        let subscription = match store.find_message_start_subscription_by_name(name)? {
            Some(subscription) => subscription,
            None => return Ok(None),
        };
        let definition_id = match subscription
            .configuration
            .as_deref()
            .or(subscription.process_definition_id.as_deref())
        {
            Some(id) => id,
            None => return Ok(None),
        };

        Ok(store
            .find_process_definition_by_id(definition_id)?
            .filter(|definition| !definition.is_suspended())
            .map(|definition| MessageCorrelationResult::ProcessDefinition {
                definition,
                start_activity_id: subscription.activity_id.clone(),
            }))
    }
}
