//! # authguard-auth
//!
//! Abuse protection consulted by the authentication flows.
//!
//! ## Modules
//!
//! - `lockout`: per-identity failure tracking with progressive lockout windows
//! - `revocation`: denylist of revoked token ids held until natural expiry
//! - `services`: explicit wiring of both, with their background sweepers

pub mod lockout;
pub mod revocation;
pub mod services;

pub use lockout::{AttemptRecord, LockoutTracker};
pub use revocation::TokenRevocationCache;
pub use services::SecurityServices;
