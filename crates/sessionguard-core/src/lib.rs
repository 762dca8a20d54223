//! Client-side session model for role-based dashboards.
//!
//! This crate decodes externally-issued bearer tokens, holds the current
//! session (with a persisted token), evaluates role requirements and gates
//! protected content behind them.
//!
//! Decoded claims are never signature-checked here. Treat them as rendering
//! hints only; enforcement belongs on the server.

pub mod auth;
pub mod clock;
pub mod config;
pub mod models;
pub mod rbac;
pub mod token;

pub use auth::{SessionEvent, SessionOptions, SessionState, SessionStore, TokenRejection};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, StorageBackend};
pub use models::{Role, RoleSet, UserProfile};
pub use rbac::{has_role, AccessGuard, MatchPolicy, Rendered, RoleRequirement};
pub use token::{decode, ClaimSet, DecodeError};
