//! Survey Submission Validation
//!
//! Domain enumerations for kiosk survey responses plus the trimming, kind
//! inference and validation applied to every submission before it is stored.

mod error;
mod normalizer;
mod survey;
mod validator;

pub use error::ValidationError;
pub use normalizer::{infer_kind_from_device, normalize_text, resolve_kind};
pub use survey::{Kind, Rating, Submission};
pub use validator::{ValidatedSubmission, Validator};
