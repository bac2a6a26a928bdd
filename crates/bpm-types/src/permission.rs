//! Permissions and permission bitsets

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single named permission.
///
/// Each permission owns one bit of a [`Permissions`] set, except `None` (no bits)
/// and `All` (every bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    None,
    All,
    Read,
    Update,
    Create,
    Delete,
    Access,
    ReadTasks,
    UpdateTasks,
    CreateInstances,
    ReadInstances,
    UpdateInstances,
    DeleteInstances,
}

impl Permission {
    pub const VALUES: [Permission; 13] = [
        Permission::None,
        Permission::All,
        Permission::Read,
        Permission::Update,
        Permission::Create,
        Permission::Delete,
        Permission::Access,
        Permission::ReadTasks,
        Permission::UpdateTasks,
        Permission::CreateInstances,
        Permission::ReadInstances,
        Permission::UpdateInstances,
        Permission::DeleteInstances,
    ];

    pub fn value(&self) -> i32 {
        match self {
            Permission::None => 0,
            Permission::All => i32::MAX,
            Permission::Read => 2,
            Permission::Update => 4,
            Permission::Create => 8,
            Permission::Delete => 16,
            Permission::Access => 32,
            Permission::ReadTasks => 64,
            Permission::UpdateTasks => 128,
            Permission::CreateInstances => 256,
            Permission::ReadInstances => 512,
            Permission::UpdateInstances => 1024,
            Permission::DeleteInstances => 2048,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Permission::None => "NONE",
            Permission::All => "ALL",
            Permission::Read => "READ",
            Permission::Update => "UPDATE",
            Permission::Create => "CREATE",
            Permission::Delete => "DELETE",
            Permission::Access => "ACCESS",
            Permission::ReadTasks => "READ_TASKS",
            Permission::UpdateTasks => "UPDATE_TASKS",
            Permission::CreateInstances => "CREATE_INSTANCES",
            Permission::ReadInstances => "READ_INSTANCES",
            Permission::UpdateInstances => "UPDATE_INSTANCES",
            Permission::DeleteInstances => "DELETE_INSTANCES",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::VALUES.into_iter().find(|p| p.name() == name)
    }

    pub fn from_value(value: i32) -> Option<Self> {
        Self::VALUES.into_iter().find(|p| p.value() == value)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitset of permissions stored on a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(i32);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const ALL: Permissions = Permissions(i32::MAX);

    pub fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> i32 {
        self.0
    }

    pub fn of(permissions: &[Permission]) -> Self {
        permissions
            .iter()
            .fold(Self::NONE, |acc, p| acc.with(*p))
    }

    pub fn with(self, permission: Permission) -> Self {
        Self(self.0 | permission.value())
    }

    pub fn without(self, permission: Permission) -> Self {
        Self(self.0 & !permission.value())
    }

    /// True if every bit of `permission` is set
    pub fn contains(&self, permission: Permission) -> bool {
        let bits = permission.value();
        self.0 & bits == bits
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Named single-bit permissions contained in this set
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::VALUES
            .into_iter()
            .filter(|p| !matches!(p, Permission::None | Permission::All))
            .filter(|p| self.contains(*p))
            .collect()
    }
}

impl From<Permission> for Permissions {
    fn from(permission: Permission) -> Self {
        Self(permission.value())
    }
}
