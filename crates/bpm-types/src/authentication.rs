//! Authenticated subject

use serde::{Deserialize, Serialize};

/// The user (and groups) on whose behalf a command runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub user_id: String,
    pub group_ids: Vec<String>,
}

impl Authentication {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_ids: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_ids.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn is_member_of(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|g| g == group_id)
    }
}
