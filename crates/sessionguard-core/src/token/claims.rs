use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Claims extracted from a token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ClaimSet {
    pub subject_id: String,
    pub roles: BTreeSet<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// `exp` in epoch seconds. `None` means the token never expires.
    pub expires_at_epoch_seconds: Option<i64>,
    pub issued_at_epoch_seconds: Option<i64>,
}

impl ClaimSet {
    /// A token is expired once `now` reaches its `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_epoch_seconds
            .map(|exp| exp <= now.timestamp())
            .unwrap_or(false)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at_epoch_seconds
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

// ============================================================================
// Raw payload shape
// ============================================================================

/// A role claim may be a single name or a list of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RoleClaim {
    One(String),
    Many(Vec<String>),
}

impl RoleClaim {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            RoleClaim::One(role) => BTreeSet::from([role]),
            RoleClaim::Many(roles) => roles.into_iter().collect(),
        }
    }
}

/// Numeric dates arrive as integers from most issuers, floats from a few.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumericDate {
    Integer(i64),
    Float(f64),
}

impl NumericDate {
    fn seconds(self) -> i64 {
        match self {
            NumericDate::Integer(secs) => secs,
            NumericDate::Float(secs) => secs.trunc() as i64,
        }
    }
}

/// Payload fields this crate understands. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    sub: Option<String>,
    role: Option<RoleClaim>,
    roles: Option<RoleClaim>,
    name: Option<String>,
    email: Option<String>,
    exp: Option<NumericDate>,
    iat: Option<NumericDate>,
}

impl RawClaims {
    /// `role` wins over `roles`; a `null` field counts as absent.
    fn normalized_roles(role: Option<RoleClaim>, roles: Option<RoleClaim>) -> BTreeSet<String> {
        role.or(roles).map(RoleClaim::into_set).unwrap_or_default()
    }

    pub(crate) fn into_claim_set(self) -> Result<ClaimSet, DecodeError> {
        let subject_id = self.sub.ok_or(DecodeError::MissingSubject)?;
        Ok(ClaimSet {
            subject_id,
            roles: Self::normalized_roles(self.role, self.roles),
            display_name: self.name,
            email: self.email,
            expires_at_epoch_seconds: self.exp.map(NumericDate::seconds),
            issued_at_epoch_seconds: self.iat.map(NumericDate::seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawClaims {
        serde_json::from_str(json).expect("Failed to parse raw claims")
    }

    #[test]
    fn test_role_field_wins_over_roles() {
        let claims = raw(r#"{"sub":"u1","role":"TEAM_LEAD","roles":["EMPLOYEE"]}"#)
            .into_claim_set()
            .unwrap();
        assert_eq!(claims.roles, BTreeSet::from(["TEAM_LEAD".to_string()]));
    }

    #[test]
    fn test_null_role_falls_through_to_roles() {
        let claims = raw(r#"{"sub":"u1","role":null,"roles":["EMPLOYEE","HR_MANAGER"]}"#)
            .into_claim_set()
            .unwrap();
        assert!(claims.roles.contains("EMPLOYEE"));
        assert!(claims.roles.contains("HR_MANAGER"));
        assert_eq!(claims.roles.len(), 2);
    }

    #[test]
    fn test_no_role_fields_yields_empty_set() {
        let claims = raw(r#"{"sub":"u1"}"#).into_claim_set().unwrap();
        assert!(claims.roles.is_empty());
        assert_eq!(claims.expires_at_epoch_seconds, None);
    }

    #[test]
    fn test_missing_subject() {
        let err = raw(r#"{"role":"ADMIN"}"#).into_claim_set().unwrap_err();
        assert_eq!(err, DecodeError::MissingSubject);
    }

    #[test]
    fn test_float_exp_is_truncated() {
        let claims = raw(r#"{"sub":"u1","exp":1700000000.9}"#).into_claim_set().unwrap();
        assert_eq!(claims.expires_at_epoch_seconds, Some(1_700_000_000));
    }

    #[test]
    fn test_is_expired_at() {
        let claims = raw(r#"{"sub":"u1","exp":1000}"#).into_claim_set().unwrap();
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        assert!(!claims.is_expired_at(at(999)));
        assert!(claims.is_expired_at(at(1000)));
        assert!(claims.is_expired_at(at(5000)));

        let forever = raw(r#"{"sub":"u1"}"#).into_claim_set().unwrap();
        assert!(!forever.is_expired_at(at(i32::MAX as i64)));
    }
}
