use thiserror::Error;

use crate::domain::validators::FieldErrors;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("`{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),
    #[error("invariant violated: {message}")]
    Invariant { message: String },
}
