//! User tasks

use crate::suspension::SuspensionState;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIORITY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DelegationState {
    Pending,
    Resolved,
}

/// A human task, either inside a process instance, inside a case instance,
/// or standalone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: Option<String>,
    pub priority: i32,
    pub assignee: Option<String>,
    pub owner: Option<String>,
    pub delegation_state: Option<DelegationState>,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub case_execution_id: Option<String>,
    pub suspension_state: SuspensionState,
}

impl Task {
    /// A task not bound to any process or case instance
    pub fn standalone() -> Self {
        Self {
            id: crate::new_id(),
            name: None,
            priority: DEFAULT_PRIORITY,
            assignee: None,
            owner: None,
            delegation_state: None,
            execution_id: None,
            process_instance_id: None,
            process_definition_id: None,
            process_definition_key: None,
            case_execution_id: None,
            suspension_state: SuspensionState::Active,
        }
    }

    /// A task created by `execution`
    pub fn for_execution(execution: &crate::Execution) -> Self {
        Self {
            execution_id: Some(execution.id.clone()),
            process_instance_id: Some(execution.process_instance_id.clone()),
            process_definition_id: Some(execution.process_definition_id.clone()),
            process_definition_key: Some(execution.process_definition_key.clone()),
            suspension_state: execution.suspension_state,
            ..Self::standalone()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_case_execution(mut self, case_execution_id: impl Into<String>) -> Self {
        self.case_execution_id = Some(case_execution_id.into());
        self
    }

    /// Hand the task to `user_id`, remembering the previous assignee as owner
    pub fn delegate(&mut self, user_id: &str) {
        if self.owner.is_none() {
            self.owner = self.assignee.clone();
        }
        self.assignee = Some(user_id.to_string());
        self.delegation_state = Some(DelegationState::Pending);
    }

    pub fn is_standalone(&self) -> bool {
        self.execution_id.is_none() && self.case_execution_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegate_keeps_first_owner() {
        let mut task = Task::standalone().with_assignee("kermit");
        task.delegate("gonzo");
        assert_eq!(task.owner.as_deref(), Some("kermit"));
        assert_eq!(task.assignee.as_deref(), Some("gonzo"));
        assert_eq!(task.delegation_state, Some(DelegationState::Pending));

        task.delegate("fozzie");
        assert_eq!(task.owner.as_deref(), Some("kermit"));
        assert_eq!(task.assignee.as_deref(), Some("fozzie"));
    }
}
