//! Jobs and job definitions

use crate::suspension::SuspensionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Template shared by all jobs created for one activity of a process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub process_definition_id: String,
    pub process_definition_key: String,
    pub activity_id: String,
    pub job_type: String,
    pub suspension_state: SuspensionState,
}

impl JobDefinition {
    pub fn new(
        process_definition_id: impl Into<String>,
        process_definition_key: impl Into<String>,
        activity_id: impl Into<String>,
        job_type: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            process_definition_id: process_definition_id.into(),
            process_definition_key: process_definition_key.into(),
            activity_id: activity_id.into(),
            job_type: job_type.into(),
            suspension_state: SuspensionState::Active,
        }
    }
}

/// A unit of asynchronous work belonging to a process instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub job_definition_id: Option<String>,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub retries: u32,
    pub suspension_state: SuspensionState,
}

impl Job {
    pub fn new() -> Self {
        Self {
            id: crate::new_id(),
            job_definition_id: None,
            execution_id: None,
            process_instance_id: None,
            process_definition_id: None,
            process_definition_key: None,
            due_date: None,
            retries: 3,
            suspension_state: SuspensionState::Active,
        }
    }

    /// Job created from `definition` for an execution of `process_instance_id`
    pub fn for_definition(definition: &JobDefinition, process_instance_id: impl Into<String>) -> Self {
        let process_instance_id = process_instance_id.into();
        Self {
            job_definition_id: Some(definition.id.clone()),
            execution_id: Some(process_instance_id.clone()),
            process_instance_id: Some(process_instance_id),
            process_definition_id: Some(definition.process_definition_id.clone()),
            process_definition_key: Some(definition.process_definition_key.clone()),
            suspension_state: definition.suspension_state,
            ..Self::new()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension_state.is_suspended()
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
