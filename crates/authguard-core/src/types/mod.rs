//! Shared domain types.

pub mod identity;

pub use identity::{LockoutIdentity, LockoutScope};
