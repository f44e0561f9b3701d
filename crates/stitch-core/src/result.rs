//! Convenience result type alias for Stitch.

use crate::error::AppError;

/// A specialized `Result` type for Stitch operations.
pub type AppResult<T> = Result<T, AppError>;
