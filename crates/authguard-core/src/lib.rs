//! # authguard-core
//!
//! Core crate for AuthGuard. Contains configuration schemas, the injected
//! clock abstraction, lockout identity keys, and the unified error system.
//!
//! This crate has **no** internal dependencies on other AuthGuard crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use traits::clock::{Clock, ManualClock, SystemClock};
