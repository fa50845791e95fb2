//! Failed authentication tracking with progressive lockout.

pub mod record;
pub mod tracker;

pub use record::AttemptRecord;
pub use tracker::LockoutTracker;
