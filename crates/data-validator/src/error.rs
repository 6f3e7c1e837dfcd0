//! Validation Error Types

use thiserror::Error;

/// Errors raised while validating a survey submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Rating is missing or not one of the four allowed levels
    #[error("calificacion invalida")]
    InvalidRating(String),

    /// Reason is missing or blank after trimming
    #[error("motivo requerido")]
    MissingReason,
}

impl ValidationError {
    /// Short machine-readable label, used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidRating(_) => "invalid_rating",
            ValidationError::MissingReason => "missing_reason",
        }
    }
}
