//! Data models for the authenticated principal.
//!
//! - `UserProfile`: the canonical shape of a decoded, accepted token
//! - `RoleSet`: immutable set of role names held by a profile
//! - `Role`: well-known role names, including the elevated markers

pub mod profile;
pub mod role;

pub use profile::UserProfile;
pub use role::{Role, RoleSet};
