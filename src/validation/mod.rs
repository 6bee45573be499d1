//! Field validation shared by the HTTP handlers and the form controller.
//!
//! Validation is pure: it never touches storage, and it reports every failing
//! field at once instead of stopping at the first one.

pub mod car;
pub mod clock;
pub mod color;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use car::{validate, validate_at, CarCandidate, CarField, CarInput};
pub use clock::{Clock, FixedClock, SystemClock};
pub use color::Color;

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Violation {
    /// Name of the offending field, as it appears in the request body
    #[schema(example = "plates")]
    pub field: String,
    /// Machine-readable rule identifier
    #[schema(example = "length")]
    pub code: String,
    #[schema(example = "Plates must have exactly 8 characters.")]
    pub message: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The complete list of violations produced by one validation call.
///
/// Never empty when constructed through [`ValidationFailure::from_violations`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationFailure(Vec<Violation>);

impl ValidationFailure {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self(violations)
    }

    pub fn single(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self(vec![Violation::new(field, code, message)])
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl From<validator::ValidationErrors> for ValidationFailure {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations: Vec<Violation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    Violation::new(field, err.code.to_string(), message)
                })
            })
            .collect();
        // field_errors() is a HashMap
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        Self(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validator_errors_keep_every_field() {
        let errors = Sample {
            name: "x".into(),
            email: "nope".into(),
        }
        .validate()
        .unwrap_err();

        let failure = ValidationFailure::from(errors);
        let fields: Vec<_> = failure.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "name"]);
        assert_eq!(failure.violations()[1].message, "too short");
        assert_eq!(failure.violations()[0].message, "email is invalid");
    }
}
