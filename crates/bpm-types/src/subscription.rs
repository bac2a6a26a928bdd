//! Event subscriptions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Message,
    Signal,
    Compensate,
}

/// A registration that an execution (or a process definition's start event)
/// waits for a named event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub id: String,
    pub event_type: EventType,
    pub event_name: Option<String>,
    /// Waiting execution; `None` for start-event subscriptions
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub activity_id: Option<String>,
    /// For start-event subscriptions, the id of the process definition to instantiate
    pub configuration: Option<String>,
    pub created: DateTime<Utc>,
}

impl EventSubscription {
    /// Message subscription of a waiting execution
    pub fn message(
        event_name: impl Into<String>,
        execution_id: impl Into<String>,
        process_instance_id: impl Into<String>,
        activity_id: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            event_type: EventType::Message,
            event_name: Some(event_name.into()),
            execution_id: Some(execution_id.into()),
            process_instance_id: Some(process_instance_id.into()),
            process_definition_id: None,
            activity_id: Some(activity_id.into()),
            configuration: None,
            created: Utc::now(),
        }
    }

    /// Message start event of a process definition
    pub fn message_start(
        event_name: impl Into<String>,
        process_definition_id: impl Into<String>,
        activity_id: impl Into<String>,
    ) -> Self {
        let process_definition_id = process_definition_id.into();
        Self {
            id: crate::new_id(),
            event_type: EventType::Message,
            event_name: Some(event_name.into()),
            execution_id: None,
            process_instance_id: None,
            configuration: Some(process_definition_id.clone()),
            process_definition_id: Some(process_definition_id),
            activity_id: Some(activity_id.into()),
            created: Utc::now(),
        }
    }

    pub fn is_message(&self) -> bool {
        self.event_type == EventType::Message
    }

    pub fn is_start_event(&self) -> bool {
        self.execution_id.is_none()
    }
}
