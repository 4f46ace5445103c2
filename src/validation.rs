//! Request field checks shared by the account endpoints.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::error::{ApiError, validation_error};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub const MAX_NAME_LENGTH: usize = 100;

/// Accumulates per-field messages and turns them into one `VALIDATION_FAILED` error.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Map<String, Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| Value::String(message.into()));
    }

    pub fn email(&mut self, field: &str, email: &str) {
        if !is_valid_email(email) {
            self.add(field, "must be a valid email address");
        }
    }

    pub fn required(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > MAX_NAME_LENGTH {
            self.add(field, format!("must be at most {MAX_NAME_LENGTH} characters"));
        }
    }

    pub fn password(&mut self, field: &str, password: &str, min_length: usize) {
        if password.chars().count() < min_length {
            self.add(
                field,
                format!("must be at least {min_length} characters"),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error(
                "Request validation failed",
                json!({ "fields": Value::Object(self.errors) }),
            ))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jean.dupont@example.fr"));
        assert!(is_valid_email("  a@b.co "));
        assert!(!is_valid_email("jean.dupont"));
        assert!(!is_valid_email("jean@localhost"));
        assert!(!is_valid_email("jean dupont@example.fr"));
    }

    #[test]
    fn collects_every_failing_field() {
        let mut errors = FieldErrors::new();
        errors.required("first_name", " ");
        errors.email("email", "nope");
        errors.password("password", "12345", 6);

        let err = errors.into_result().unwrap_err();
        assert_eq!(&*err.code, "VALIDATION_FAILED");
        let details = err.details.unwrap();
        let fields = details["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn clean_input_passes() {
        let mut errors = FieldErrors::new();
        errors.required("last_name", "Martin");
        errors.password("password", "secret1", 6);
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }
}
