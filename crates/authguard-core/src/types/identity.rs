//! Composite lockout identities.
//!
//! An identity is a principal (usually an email) plus an origin (usually a
//! client IP). Each half becomes its own sub-key and is tracked
//! independently.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace for lockout keys, so separate flows never share records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutScope {
    /// Credential verification at login.
    Login,
    /// Password reset requests.
    PasswordReset,
}

impl LockoutScope {
    fn prefixes(self) -> (&'static str, &'static str) {
        match self {
            LockoutScope::Login => ("principal:", "origin:"),
            LockoutScope::PasswordReset => ("email:", "ip:"),
        }
    }
}

impl fmt::Display for LockoutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockoutScope::Login => write!(f, "login"),
            LockoutScope::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// A normalized principal/origin pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockoutIdentity {
    principal: String,
    origin: String,
}

impl LockoutIdentity {
    /// Builds an identity, trimming and case-folding both halves.
    pub fn new(principal: &str, origin: &str) -> Self {
        Self {
            principal: normalize(principal),
            origin: normalize(origin),
        }
    }

    /// The two independent map keys for this identity within `scope`.
    pub fn sub_keys(&self, scope: LockoutScope) -> [String; 2] {
        let (principal_prefix, origin_prefix) = scope.prefixes();
        [
            format!("{principal_prefix}{}", self.principal),
            format!("{origin_prefix}{}", self.origin),
        ]
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
