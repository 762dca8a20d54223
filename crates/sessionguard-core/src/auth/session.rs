use thiserror::Error;
use tracing::{debug, info, warn};

use super::storage::TokenStorage;
use crate::clock::Clock;
use crate::models::profile::DEFAULT_DISPLAY_NAME;
use crate::models::UserProfile;
use crate::rbac::has_role;
use crate::token::{decode, DecodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `restore` has not run and nothing has logged in yet
    Uninitialized,
    Anonymous,
    Authenticated,
}

/// Why a token was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Token expired at {expired_at} (epoch seconds)")]
    Expired { expired_at: i64 },

    #[error("Token could not be persisted: {0}")]
    Unpersisted(String),
}

/// Notification delivered to subscribers after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Restored(SessionState),
    LoggedIn { subject_id: String },
    LoggedOut,
    Rejected(TokenRejection),
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&SessionEvent)>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Display name for tokens without a `name` claim
    pub display_name_placeholder: String,
    /// Apply the restore-time expiry check to `login` as well
    pub reject_expired_on_login: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            display_name_placeholder: DEFAULT_DISPLAY_NAME.to_string(),
            reject_expired_on_login: false,
        }
    }
}

/// Token and profile only ever exist together.
#[derive(Debug, Clone)]
struct ActiveSession {
    token: String,
    profile: UserProfile,
}

/// Owner of the current session.
///
/// Construct one at startup and hand out references. Every operation runs to
/// completion and never returns an error: anything that goes wrong leaves the
/// session anonymous, with the reason available from `last_rejection` and in
/// the logs.
///
/// Storage is not synchronised between processes; the last writer wins.
pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
    clock: Box<dyn Clock>,
    options: SessionOptions,
    active: Option<ActiveSession>,
    initialized: bool,
    last_rejection: Option<TokenRejection>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl SessionStore {
    pub fn new(storage: Box<dyn TokenStorage>, clock: Box<dyn Clock>, options: SessionOptions) -> Self {
        Self {
            storage,
            clock,
            options,
            active: None,
            initialized: false,
            last_rejection: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ===== Observables =====

    pub fn state(&self) -> SessionState {
        match (&self.active, self.initialized) {
            (Some(_), _) => SessionState::Authenticated,
            (None, true) => SessionState::Anonymous,
            (None, false) => SessionState::Uninitialized,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.active.as_ref().map(|a| &a.profile)
    }

    pub fn current_token(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.token.as_str())
    }

    /// The most recent reason a token was turned away, cleared by a successful login
    pub fn last_rejection(&self) -> Option<&TokenRejection> {
        self.last_rejection.as_ref()
    }

    pub fn has_role(&self, role: &str) -> bool {
        has_role(self.current_user(), role)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    // ===== Transitions =====

    /// Pick up a persisted token at startup.
    ///
    /// Malformed and expired tokens are cleared from storage. An unreadable
    /// store is treated as holding no token.
    pub fn restore(&mut self) -> SessionState {
        self.initialized = true;

        let token = match self.storage.read() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No persisted token");
                self.active = None;
                return self.finish_restore();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token, starting anonymous");
                self.reset();
                return self.finish_restore();
            }
        };

        match self.accept(&token, true) {
            Ok(active) => {
                info!(subject = %active.profile.subject_id(), "Session restored");
                self.active = Some(active);
            }
            Err(rejection) => {
                warn!(reason = %rejection, "Discarding persisted token");
                self.reject(rejection);
            }
        }
        self.finish_restore()
    }

    /// Replace the session with one built from `token`.
    ///
    /// On success the token is persisted. On failure any previous session is
    /// ended and storage cleared.
    pub fn login(&mut self, token: &str) -> SessionState {
        self.initialized = true;

        let active = match self.accept(token, self.options.reject_expired_on_login) {
            Ok(active) => active,
            Err(rejection) => {
                warn!(reason = %rejection, "Login rejected");
                self.reject(rejection);
                return self.state();
            }
        };

        if let Err(e) = self.storage.write(&active.token) {
            warn!(error = %e, "Failed to persist token, login abandoned");
            self.reject(TokenRejection::Unpersisted(e.to_string()));
            return self.state();
        }

        let subject_id = active.profile.subject_id().to_string();
        info!(subject = %subject_id, roles = %active.profile.roles(), "Logged in");
        self.active = Some(active);
        self.last_rejection = None;
        self.emit(SessionEvent::LoggedIn { subject_id });
        self.state()
    }

    /// End the session. Safe to call when already anonymous.
    pub fn logout(&mut self) {
        self.initialized = true;
        if let Some(ref active) = self.active {
            info!(subject = %active.profile.subject_id(), "Logged out");
        }
        self.reset();
        self.emit(SessionEvent::LoggedOut);
    }

    // ===== Internals =====

    fn accept(&self, token: &str, check_expiry: bool) -> Result<ActiveSession, TokenRejection> {
        let claims = decode(token)?;
        if check_expiry && claims.is_expired_at(self.clock.now()) {
            if let Some(expired_at) = claims.expires_at_epoch_seconds {
                return Err(TokenRejection::Expired { expired_at });
            }
        }
        let profile = UserProfile::from_claims(claims, &self.options.display_name_placeholder);
        Ok(ActiveSession {
            token: token.to_string(),
            profile,
        })
    }

    fn reject(&mut self, rejection: TokenRejection) {
        self.reset();
        self.last_rejection = Some(rejection.clone());
        self.emit(SessionEvent::Rejected(rejection));
    }

    /// Drop the in-memory session and the persisted token together.
    fn reset(&mut self) {
        self.active = None;
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted token");
        }
    }

    fn finish_restore(&mut self) -> SessionState {
        let state = self.state();
        self.emit(SessionEvent::Restored(state));
        state
    }

    fn emit(&mut self, event: SessionEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}
