//! Submission Validator

use crate::error::ValidationError;
use crate::normalizer::{normalize_text, resolve_kind};
use crate::survey::{Kind, Rating, Submission};
use serde_json::Value;
use tracing::debug;

/// A submission that passed validation, with every field normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub rating: Rating,
    pub reason: String,
    pub site: String,
    pub device_id: String,
    pub kind: Kind,
    /// Free-form metadata, `{}` when absent
    pub meta: Value,
}

/// Validator for kiosk survey submissions
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate the rating label after trimming
    pub fn validate_rating(&self, raw: Option<&str>) -> Result<Rating, ValidationError> {
        let label = normalize_text(raw);
        label
            .parse::<Rating>()
            .map_err(|_| ValidationError::InvalidRating(label))
    }

    /// Validate that the reason is present and non-blank
    pub fn validate_reason(&self, raw: Option<&str>) -> Result<String, ValidationError> {
        let reason = normalize_text(raw);
        if reason.is_empty() {
            Err(ValidationError::MissingReason)
        } else {
            Ok(reason)
        }
    }

    /// Validate a full submission. The rating is checked before the reason.
    pub fn validate(&self, submission: Submission) -> Result<ValidatedSubmission, ValidationError> {
        let rating = self.validate_rating(submission.calificacion.as_deref())?;
        let reason = self.validate_reason(submission.motivo.as_deref())?;

        let site = normalize_text(submission.sede.as_deref());
        let device_id = normalize_text(submission.dispositivo_id.as_deref());
        let kind = resolve_kind(submission.tipo.as_deref(), &device_id);
        let meta = normalize_meta(submission.meta);

        debug!(%rating, %kind, "submission validated");

        Ok(ValidatedSubmission {
            rating,
            reason,
            site,
            device_id,
            kind,
            meta,
        })
    }
}

/// Missing or falsy metadata collapses to an empty object
fn normalize_meta(meta: Option<Value>) -> Value {
    match meta {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Value::Object(Default::default()),
        Some(Value::String(s)) if s.is_empty() => Value::Object(Default::default()),
        Some(Value::Array(items)) if items.is_empty() => Value::Object(Default::default()),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::Object(Default::default()),
        Some(value) => value,
    }
}
