//! Background tasks for AuthGuard.
//!
//! This crate provides the [`PeriodicSweeper`], a fixed-interval callback
//! loop scheduled on an injected [`Clock`](authguard_core::Clock).

pub mod sweeper;

pub use sweeper::{PeriodicSweeper, SweepCallback};
