//! User operation log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod entity_type {
    pub const PROCESS_DEFINITION: &str = "ProcessDefinition";
    pub const PROCESS_INSTANCE: &str = "ProcessInstance";
    pub const JOB_DEFINITION: &str = "JobDefinition";
    pub const JOB: &str = "Job";
    pub const TASK: &str = "Task";
}

pub mod operation_type {
    pub const SUSPEND: &str = "Suspend";
    pub const ACTIVATE: &str = "Activate";
    pub const SUSPEND_PROCESS_DEFINITION: &str = "SuspendProcessDefinition";
    pub const ACTIVATE_PROCESS_DEFINITION: &str = "ActivateProcessDefinition";
    pub const SUSPEND_JOB_DEFINITION: &str = "SuspendJobDefinition";
    pub const ACTIVATE_JOB_DEFINITION: &str = "ActivateJobDefinition";
    pub const SUSPEND_JOB: &str = "SuspendJob";
    pub const ACTIVATE_JOB: &str = "ActivateJob";
    pub const DELEGATE: &str = "Delegate";
    pub const SET_PRIORITY: &str = "SetPriority";
}

/// One changed property of an audited operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property_name: String,
    pub org_value: Option<String>,
    pub new_value: Option<String>,
}

impl PropertyChange {
    pub fn new(
        property_name: impl Into<String>,
        org_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            org_value,
            new_value,
        }
    }
}

/// Audit record of one administrative operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperationLogEntry {
    pub id: String,
    pub operation_type: String,
    pub entity_type: String,
    /// Authenticated user, `None` for engine-initiated work
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub job_id: Option<String>,
    pub job_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub task_id: Option<String>,
    pub property_changes: Vec<PropertyChange>,
}

impl UserOperationLogEntry {
    pub fn new(operation_type: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            operation_type: operation_type.into(),
            entity_type: entity_type.into(),
            user_id: None,
            timestamp: Utc::now(),
            job_id: None,
            job_definition_id: None,
            process_instance_id: None,
            process_definition_id: None,
            process_definition_key: None,
            task_id: None,
            property_changes: Vec::new(),
        }
    }

    pub fn with_property_change(mut self, change: PropertyChange) -> Self {
        self.property_changes.push(change);
        self
    }

    pub fn property_change(&self, property_name: &str) -> Option<&PropertyChange> {
        self.property_changes
            .iter()
            .find(|c| c.property_name == property_name)
    }
}
