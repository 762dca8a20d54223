//! Role-based access decisions.
//!
//! - `has_role`: single-role check with the elevated-marker bypass
//! - `RoleRequirement`: a list of roles plus an any/all match policy
//! - `AccessGuard`: picks protected or fallback content from a requirement

pub mod evaluator;
pub mod guard;

pub use evaluator::{has_role, MatchPolicy, RoleRequirement};
pub use guard::{AccessGuard, Rendered};
