//! Token execution stand-in
//!
//! The in-memory runtime does not walk a process graph. Delivering an event
//! records it, merges the payload into the process variables and consumes the
//! subscription; starting an instance creates the instance execution at the
//! requested activity.

use crate::memory::{InMemoryStore, ReceivedEvent};
use bpm_command::ProcessRuntime;
use bpm_types::{
    EngineError, EngineResult, EventSubscription, Execution, ProcessDefinition, VariableMap,
};
use tracing::debug;

impl ProcessRuntime for InMemoryStore {
    fn event_received(
        &self,
        subscription: &EventSubscription,
        payload: Option<VariableMap>,
    ) -> EngineResult<()> {
        let mut state = self.state().write();

        let execution_id = subscription
            .execution_id
            .as_deref()
            .ok_or_else(|| EngineError::Validation("Subscription has no execution".into()))?;
        let process_instance_id = state
            .executions
            .get(execution_id)
            .map(|e| e.process_instance_id.clone())
            .ok_or_else(|| EngineError::not_found("execution", execution_id))?;

        if let (Some(variables), Some(instance)) =
            (&payload, state.executions.get_mut(&process_instance_id))
        {
            instance
                .variables
                .extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        state.subscriptions.remove(&subscription.id);
        state.received_events.push(ReceivedEvent {
            subscription: subscription.clone(),
            payload,
        });
        debug!(
            subscription_id = %subscription.id,
            execution_id,
            "Event delivered"
        );
        Ok(())
    }

    fn start_process_instance(
        &self,
        definition: &ProcessDefinition,
        business_key: Option<&str>,
        start_activity_id: Option<&str>,
        variables: VariableMap,
    ) -> EngineResult<Execution> {
        let mut instance = Execution::process_instance(definition);
        instance.business_key = business_key.map(str::to_string);
        instance.activity_id = start_activity_id.map(str::to_string);
        instance.variables = variables;

        self.state()
            .write()
            .executions
            .insert(instance.id.clone(), instance.clone());
        debug!(
            process_instance_id = %instance.id,
            process_definition_id = %definition.id,
            "Process instance started"
        );
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_merges_payload_and_consumes_subscription() {
        let store = InMemoryStore::new();
        let definition = ProcessDefinition::new("order", 1);
        let pi = Execution::process_instance(&definition)
            .with_id("pi-1")
            .with_variable("amount", json!(10));
        let waiting = Execution::child_of(&pi).with_id("ex-1");
        store.insert_execution(pi);
        store.insert_execution(waiting);
        let subscription = EventSubscription::message("paid", "ex-1", "pi-1", "waitForPayment");
        store.insert_subscription(subscription.clone());

        let mut payload = VariableMap::new();
        payload.insert("amount".into(), json!(12));
        payload.insert("method".into(), json!("card"));
        store.event_received(&subscription, Some(payload)).unwrap();

        let instance = store.execution("pi-1").unwrap();
        assert_eq!(instance.variables.get("amount"), Some(&json!(12)));
        assert_eq!(instance.variables.get("method"), Some(&json!("card")));
        assert!(store.subscriptions().is_empty());
        assert_eq!(store.received_events().len(), 1);
    }

    #[test]
    fn test_event_for_missing_execution() {
        let store = InMemoryStore::new();
        let subscription = EventSubscription::message("paid", "gone", "pi-1", "a");
        assert!(store.event_received(&subscription, None).unwrap_err().is_not_found());
    }

    #[test]
    fn test_start_positions_instance() {
        let store = InMemoryStore::new();
        let definition = ProcessDefinition::new("order", 1);
        let instance = store
            .start_process_instance(&definition, Some("order-7"), Some("messageStart"), VariableMap::new())
            .unwrap();
        assert!(instance.is_process_instance());
        assert_eq!(instance.activity_id.as_deref(), Some("messageStart"));
        assert_eq!(store.process_instances_of(&definition.id).len(), 1);
    }
}
