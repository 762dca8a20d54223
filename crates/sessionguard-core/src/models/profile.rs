use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::RoleSet;
use crate::token::ClaimSet;

/// Display name used when a token carries no `name` claim
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// The authenticated principal of the current session.
///
/// A profile is never mutated; a new login produces a new profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    subject_id: String,
    roles: RoleSet,
    display_name: String,
    email: Option<String>,
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    expires_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_claims(claims: ClaimSet, placeholder_name: &str) -> Self {
        let expires_at = claims.expires_at();
        Self {
            subject_id: claims.subject_id,
            roles: RoleSet::from(claims.roles),
            display_name: claims
                .display_name
                .unwrap_or_else(|| placeholder_name.to_string()),
            email: claims.email,
            expires_at,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Minutes remaining until expiry (for display), `None` if the token never expires
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|exp| (exp - now).num_minutes().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn claims(display_name: Option<&str>, exp: Option<i64>) -> ClaimSet {
        ClaimSet {
            subject_id: "u1".to_string(),
            roles: BTreeSet::from(["EMPLOYEE".to_string()]),
            display_name: display_name.map(str::to_string),
            email: None,
            expires_at_epoch_seconds: exp,
            issued_at_epoch_seconds: None,
        }
    }

    #[test]
    fn test_placeholder_display_name() {
        let profile = UserProfile::from_claims(claims(None, None), DEFAULT_DISPLAY_NAME);
        assert_eq!(profile.display_name(), "User");

        let named = UserProfile::from_claims(claims(Some("Avery"), None), DEFAULT_DISPLAY_NAME);
        assert_eq!(named.display_name(), "Avery");
    }

    #[test]
    fn test_minutes_until_expiry() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let exp = (now + Duration::minutes(45)).timestamp();

        let profile = UserProfile::from_claims(claims(None, Some(exp)), DEFAULT_DISPLAY_NAME);
        assert_eq!(profile.minutes_until_expiry(now), Some(45));
        assert_eq!(profile.minutes_until_expiry(now + Duration::hours(2)), Some(0));

        let forever = UserProfile::from_claims(claims(None, None), DEFAULT_DISPLAY_NAME);
        assert_eq!(forever.minutes_until_expiry(now), None);
    }
}
