//! Shared result alias.

use crate::error::AppError;

/// Every fallible operation in the workspace returns this alias so that
/// callers can rely on `?` converting into [`AppError`].
pub type AppResult<T> = Result<T, AppError>;
