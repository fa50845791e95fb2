//! Revoked access token denylist.

pub mod cache;

pub use cache::TokenRevocationCache;
