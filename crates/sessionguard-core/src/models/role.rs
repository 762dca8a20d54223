use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known role names used by the dashboard.
///
/// Roles are plain strings on the wire; any name is valid. These constants
/// only cover the names the application itself refers to.
pub struct Role;

impl Role {
    pub const ADMIN: &'static str = "ADMIN";
    pub const SUPER_ADMIN: &'static str = "SUPER_ADMIN";
    pub const HR_MANAGER: &'static str = "HR_MANAGER";
    pub const TEAM_LEAD: &'static str = "TEAM_LEAD";
    pub const EMPLOYEE: &'static str = "EMPLOYEE";

    /// Holding any of these grants every role.
    pub const ELEVATED: [&'static str; 2] = [Self::ADMIN, Self::SUPER_ADMIN];

    pub fn is_elevated(role: &str) -> bool {
        Self::ELEVATED.contains(&role)
    }
}

/// The roles held by a profile. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Exact, case-sensitive membership.
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_elevated(&self) -> bool {
        Role::ELEVATED.iter().any(|marker| self.0.contains(*marker))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<BTreeSet<String>> for RoleSet {
    fn from(roles: BTreeSet<String>) -> Self {
        Self(roles)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(", "))
    }
}
