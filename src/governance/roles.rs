//! Role capability set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::Address;

/// Named capability held by a set of addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May grant and revoke every role.
    Admin,
    /// May schedule operations on the delay queue.
    Proposer,
}

impl Role {
    /// Conventional constant-style name, e.g. `PROPOSER_ROLE`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN_ROLE",
            Self::Proposer => "PROPOSER_ROLE",
        }
    }

    /// Role whose holders may grant and revoke this one.
    #[must_use]
    pub const fn admin_role(self) -> Self {
        match self {
            Self::Admin | Self::Proposer => Self::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping from role to its holders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleSet {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has(&self, role: Role, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|holders| holders.contains(&account))
    }

    /// Adds `account` to `role`. Returns `false` if it already held it.
    pub fn grant(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Removes `account` from `role`. Returns `false` if it did not hold it.
    pub fn revoke(&mut self, role: Role, account: Address) -> bool {
        self.members
            .get_mut(&role)
            .is_some_and(|holders| holders.remove(&account))
    }

    /// Holders of `role`, in address order.
    pub fn holders(&self, role: Role) -> impl Iterator<Item = Address> + '_ {
        self.members.get(&role).into_iter().flatten().copied()
    }
}
