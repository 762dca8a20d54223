use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// Whether `profile` holds `role`.
///
/// No profile never holds a role. A profile holding `ADMIN` or `SUPER_ADMIN`
/// holds every role, including names it never mentions. Otherwise the match
/// is exact and case-sensitive, with no hierarchy between ordinary roles.
pub fn has_role(profile: Option<&UserProfile>, role: &str) -> bool {
    match profile {
        None => false,
        Some(profile) => profile.roles().is_elevated() || profile.roles().contains(role),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// At least one listed role
    #[default]
    Any,
    /// Every listed role
    All,
}

/// Roles a caller must hold to see protected content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequirement {
    pub roles: Vec<String>,
    pub policy: MatchPolicy,
}

impl RoleRequirement {
    pub fn any<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            policy: MatchPolicy::Any,
        }
    }

    pub fn all<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            policy: MatchPolicy::All,
        }
    }

    /// An empty requirement admits everyone, signed in or not.
    pub fn is_satisfied_by(&self, profile: Option<&UserProfile>) -> bool {
        if self.roles.is_empty() {
            return true;
        }
        let Some(profile) = profile else {
            return false;
        };
        match self.policy {
            MatchPolicy::Any => self.roles.iter().any(|role| has_role(Some(profile), role)),
            MatchPolicy::All => self.roles.iter().all(|role| has_role(Some(profile), role)),
        }
    }
}
