//! Correlation requests and results

use bpm_types::{EngineError, EngineResult, EventSubscription, Execution, ProcessDefinition, VariableMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a message must agree with to reach a target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationSet {
    pub business_key: Option<String>,
    pub process_instance_id: Option<String>,
    /// Process variables that must be equal on a waiting execution's instance
    pub correlation_keys: VariableMap,
}

impl CorrelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.business_key.is_none()
            && self.process_instance_id.is_none()
            && self.correlation_keys.is_empty()
    }
}

impl fmt::Display for CorrelationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CorrelationSet [businessKey={}, processInstanceId={}, correlationKeys={:?}]",
            self.business_key.as_deref().unwrap_or("null"),
            self.process_instance_id.as_deref().unwrap_or("null"),
            self.correlation_keys
        )
    }
}

/// One resolved target of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageCorrelationResult {
    /// A waiting execution and the subscription it waits on
    Execution {
        execution: Execution,
        subscription: EventSubscription,
    },
    /// A message start event; a new instance begins at `start_activity_id`
    ProcessDefinition {
        definition: ProcessDefinition,
        start_activity_id: Option<String>,
    },
}

impl MessageCorrelationResult {
    pub fn is_execution(&self) -> bool {
        matches!(self, MessageCorrelationResult::Execution { .. })
    }

    pub fn process_definition_key(&self) -> &str {
        match self {
            MessageCorrelationResult::Execution { execution, .. } => &execution.process_definition_key,
            MessageCorrelationResult::ProcessDefinition { definition, .. } => &definition.key,
        }
    }
}

/// A message to correlate, with its correlation criteria and payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageCorrelation {
    pub message_name: Option<String>,
    pub correlation_set: CorrelationSet,
    /// Delivered to resumed executions; initial variables of started instances
    pub process_variables: VariableMap,
}

impl MessageCorrelation {
    pub fn new(message_name: impl Into<String>) -> Self {
        Self {
            message_name: Some(message_name.into()),
            ..Self::default()
        }
    }

    /// A correlation that matches on criteria only, whatever message is awaited
    pub fn without_name() -> Self {
        Self::default()
    }

    pub fn process_instance_business_key(mut self, business_key: impl Into<String>) -> Self {
        self.correlation_set.business_key = Some(business_key.into());
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_set.process_instance_id = Some(id.into());
        self
    }

    pub fn process_instance_variable_equals(
        mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.correlation_set.correlation_keys.insert(name.into(), value);
        self
    }

    pub fn set_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.process_variables.insert(name.into(), value);
        self
    }

    pub fn set_variables(mut self, variables: VariableMap) -> Self {
        self.process_variables.extend(variables);
        self
    }

    pub fn message_name(&self) -> Option<&str> {
        self.message_name.as_deref()
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.message_name.is_none() && self.correlation_set.is_empty() {
            return Err(EngineError::Validation(
                "At least one of the following correlation criteria has to be present: \
                 messageName, businessKey, correlationKeys, processInstanceId"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Payload for a resumed execution
    pub(crate) fn payload(&self) -> Option<VariableMap> {
        if self.process_variables.is_empty() {
            None
        } else {
            Some(self.process_variables.clone())
        }
    }
}
