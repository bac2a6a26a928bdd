//! Suspension state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a resource may make progress.
///
/// Carried by process definitions, process instances, jobs and job definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspensionState {
    #[default]
    Active,
    Suspended,
}

impl SuspensionState {
    pub fn state_code(&self) -> i32 {
        match self {
            SuspensionState::Active => 1,
            SuspensionState::Suspended => 2,
        }
    }

    /// Name recorded in the operation log
    pub fn name(&self) -> &'static str {
        match self {
            SuspensionState::Active => "active",
            SuspensionState::Suspended => "suspended",
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, SuspensionState::Suspended)
    }
}

impl fmt::Display for SuspensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
