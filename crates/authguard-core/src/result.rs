//! Convenience result type alias for AuthGuard.

use crate::error::AppError;

/// A specialized `Result` type for AuthGuard operations.
pub type AppResult<T> = Result<T, AppError>;
