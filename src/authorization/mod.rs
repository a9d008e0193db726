//! Per-resource access control composed in front of repository operations.

pub mod guard;

pub use guard::{AccessGuard, GrantLookup, GuardError, Guarded};
