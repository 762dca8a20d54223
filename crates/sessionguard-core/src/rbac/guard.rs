use super::evaluator::{MatchPolicy, RoleRequirement};
use crate::auth::SessionStore;
use crate::models::UserProfile;

/// Outcome of evaluating an `AccessGuard`.
#[derive(Debug, PartialEq, Eq)]
pub enum Rendered<'a, C, F> {
    Protected(&'a C),
    Fallback(&'a F),
    Nothing,
}

impl<C, F> Rendered<'_, C, F> {
    pub fn is_protected(&self) -> bool {
        matches!(self, Rendered::Protected(_))
    }
}

impl<'a, T> Rendered<'a, T, T> {
    /// Whatever should be shown, protected or fallback.
    pub fn content(self) -> Option<&'a T> {
        match self {
            Rendered::Protected(content) | Rendered::Fallback(content) => Some(content),
            Rendered::Nothing => None,
        }
    }
}

/// Conditional rendering boundary: protected content behind a role requirement.
///
/// A guard holds no session state. Every `evaluate`/`render` call reads the
/// profile it is given, so a guard kept across logins follows the session.
#[derive(Debug, Clone)]
pub struct AccessGuard<C, F = C> {
    content: C,
    fallback: Option<F>,
    requirement: RoleRequirement,
}

impl<C> AccessGuard<C, C> {
    /// A guard with no required roles and no fallback (a pass-through).
    pub fn new(content: C) -> Self {
        Self {
            content,
            fallback: None,
            requirement: RoleRequirement::default(),
        }
    }
}

impl<C, F> AccessGuard<C, F> {
    pub fn require<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirement
            .roles
            .extend(roles.into_iter().map(Into::into));
        self
    }

    /// Demand every required role instead of any one of them.
    pub fn require_all(mut self) -> Self {
        self.requirement.policy = MatchPolicy::All;
        self
    }

    pub fn with_requirement(mut self, requirement: RoleRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn fallback<G>(self, fallback: G) -> AccessGuard<C, G> {
        AccessGuard {
            content: self.content,
            fallback: Some(fallback),
            requirement: self.requirement,
        }
    }

    pub fn requirement(&self) -> &RoleRequirement {
        &self.requirement
    }

    pub fn is_granted(&self, profile: Option<&UserProfile>) -> bool {
        self.requirement.is_satisfied_by(profile)
    }

    pub fn evaluate(&self, profile: Option<&UserProfile>) -> Rendered<'_, C, F> {
        if self.is_granted(profile) {
            Rendered::Protected(&self.content)
        } else {
            match self.fallback {
                Some(ref fallback) => Rendered::Fallback(fallback),
                None => Rendered::Nothing,
            }
        }
    }

    /// Evaluate against the session's current user.
    pub fn render(&self, session: &SessionStore) -> Rendered<'_, C, F> {
        self.evaluate(session.current_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use crate::auth::{SessionOptions, SessionStore};
    use crate::clock::SystemClock;
    use crate::token::encode_unsigned;
    use serde_json::json;

    fn store() -> SessionStore {
        SessionStore::new(
            Box::new(MemoryStorage::default()),
            Box::new(SystemClock),
            SessionOptions::default(),
        )
    }

    fn token(roles: &[&str]) -> String {
        encode_unsigned(&json!({"sub": "u1", "roles": roles}))
    }

    #[test]
    fn test_empty_requirement_renders_content_for_anyone() {
        let guard = AccessGuard::new("dashboard").fallback("sign in");
        let mut session = store();
        assert_eq!(guard.render(&session), Rendered::Protected(&"dashboard"));

        session.login(&token(&["EMPLOYEE"]));
        assert_eq!(guard.render(&session), Rendered::Protected(&"dashboard"));
    }

    #[test]
    fn test_anonymous_gets_fallback_or_nothing() {
        let session = store();
        let with_fallback = AccessGuard::new("payroll")
            .require(["HR_MANAGER"])
            .fallback("no access");
        assert_eq!(with_fallback.render(&session), Rendered::Fallback(&"no access"));

        let bare = AccessGuard::new("payroll").require(["HR_MANAGER"]);
        assert_eq!(bare.render(&session), Rendered::Nothing);
        assert_eq!(bare.render(&session).content(), None);
    }

    #[test]
    fn test_require_all() {
        let guard = AccessGuard::new("both").require(["A", "B"]).require_all();

        let mut session = store();
        session.login(&token(&["A"]));
        assert!(!guard.render(&session).is_protected());

        session.login(&token(&["A", "B"]));
        assert!(guard.render(&session).is_protected());

        session.login(&token(&["ADMIN"]));
        assert!(guard.render(&session).is_protected());
    }

    #[test]
    fn test_guard_follows_session_changes() {
        let guard = AccessGuard::new(1).require(["TEAM_LEAD", "HR_MANAGER"]).fallback(0);
        let mut session = store();
        assert_eq!(guard.render(&session).content(), Some(&0));

        session.login(&token(&["TEAM_LEAD"]));
        assert_eq!(guard.render(&session).content(), Some(&1));

        session.logout();
        assert_eq!(guard.render(&session).content(), Some(&0));
    }

    #[test]
    fn test_with_requirement_replaces_roles() {
        let guard = AccessGuard::new(())
            .require(["EMPLOYEE"])
            .with_requirement(RoleRequirement::all(["HR_MANAGER"]));
        assert_eq!(guard.requirement().roles, vec!["HR_MANAGER".to_string()]);
        assert_eq!(guard.requirement().policy, MatchPolicy::All);
    }
}
