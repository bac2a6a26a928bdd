//! Process definitions and executions

use crate::suspension::SuspensionState;
use crate::VariableMap;
use serde::{Deserialize, Serialize};

/// A deployed process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: String,
    pub key: String,
    pub version: u32,
    pub name: Option<String>,
    pub suspension_state: SuspensionState,
}

impl ProcessDefinition {
    pub fn new(key: impl Into<String>, version: u32) -> Self {
        let key = key.into();
        Self {
            id: format!("{}:{}:{}", key, version, crate::new_id()),
            key,
            version,
            name: None,
            suspension_state: SuspensionState::Active,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension_state.is_suspended()
    }
}

/// A path of execution inside a process instance.
///
/// The process instance itself is the execution whose id equals its
/// `process_instance_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub process_instance_id: String,
    pub parent_id: Option<String>,
    pub process_definition_id: String,
    pub process_definition_key: String,
    pub activity_id: Option<String>,
    pub business_key: Option<String>,
    pub is_active: bool,
    pub suspension_state: SuspensionState,
    /// Variables; on a process instance these are the process variables
    pub variables: VariableMap,
}

impl Execution {
    /// Create a new process instance of `definition`
    pub fn process_instance(definition: &ProcessDefinition) -> Self {
        let id = crate::new_id();
        Self {
            process_instance_id: id.clone(),
            id,
            parent_id: None,
            process_definition_id: definition.id.clone(),
            process_definition_key: definition.key.clone(),
            activity_id: None,
            business_key: None,
            is_active: true,
            suspension_state: SuspensionState::Active,
            variables: VariableMap::new(),
        }
    }

    /// Create a child execution of `parent`
    pub fn child_of(parent: &Execution) -> Self {
        Self {
            id: crate::new_id(),
            process_instance_id: parent.process_instance_id.clone(),
            parent_id: Some(parent.id.clone()),
            process_definition_id: parent.process_definition_id.clone(),
            process_definition_key: parent.process_definition_key.clone(),
            activity_id: None,
            business_key: None,
            is_active: true,
            suspension_state: parent.suspension_state,
            variables: VariableMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if self.is_process_instance() {
            self.process_instance_id = id.clone();
        }
        self.id = id;
        self
    }

    pub fn with_business_key(mut self, business_key: impl Into<String>) -> Self {
        self.business_key = Some(business_key.into());
        self
    }

    pub fn with_activity(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn is_process_instance(&self) -> bool {
        self.id == self.process_instance_id
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension_state.is_suspended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_instance_shape() {
        let definition = ProcessDefinition::new("invoice", 1);
        let instance = Execution::process_instance(&definition).with_id("pi-1");
        assert!(instance.is_process_instance());
        assert_eq!(instance.process_instance_id, "pi-1");
        assert_eq!(instance.process_definition_key, "invoice");

        let child = Execution::child_of(&instance);
        assert!(!child.is_process_instance());
        assert_eq!(child.parent_id.as_deref(), Some("pi-1"));
    }
}
