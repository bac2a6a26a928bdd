//! Resources that grants apply to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard resource id: a grant on `ANY` covers every instance of its resource type.
pub const ANY: &str = "*";

/// Kind of resource protected by the permission-check engine.
///
/// The numeric type ids are part of the persisted grant format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Application,
    User,
    Group,
    GroupMembership,
    Authorization,
    Filter,
    ProcessDefinition,
    Task,
    ProcessInstance,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Application,
        Resource::User,
        Resource::Group,
        Resource::GroupMembership,
        Resource::Authorization,
        Resource::Filter,
        Resource::ProcessDefinition,
        Resource::Task,
        Resource::ProcessInstance,
    ];

    /// Stable numeric type id
    pub fn resource_type(&self) -> i32 {
        match self {
            Resource::Application => 0,
            Resource::User => 1,
            Resource::Group => 2,
            Resource::GroupMembership => 3,
            Resource::Authorization => 4,
            Resource::Filter => 5,
            Resource::ProcessDefinition => 6,
            Resource::Task => 7,
            Resource::ProcessInstance => 8,
        }
    }

    /// Name used in error messages
    pub fn resource_name(&self) -> &'static str {
        match self {
            Resource::Application => "Application",
            Resource::User => "User",
            Resource::Group => "Group",
            Resource::GroupMembership => "GroupMembership",
            Resource::Authorization => "Authorization",
            Resource::Filter => "Filter",
            Resource::ProcessDefinition => "ProcessDefinition",
            Resource::Task => "Task",
            Resource::ProcessInstance => "ProcessInstance",
        }
    }

    pub fn from_resource_type(resource_type: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.resource_type() == resource_type)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_ids_are_stable() {
        assert_eq!(Resource::Application.resource_type(), 0);
        assert_eq!(Resource::Authorization.resource_type(), 4);
        assert_eq!(Resource::ProcessDefinition.resource_type(), 6);
        assert_eq!(Resource::ProcessInstance.resource_type(), 8);
    }

    #[test]
    fn test_from_resource_type() {
        for resource in Resource::ALL {
            assert_eq!(
                Resource::from_resource_type(resource.resource_type()),
                Some(resource)
            );
        }
        assert_eq!(Resource::from_resource_type(42), None);
    }
}
