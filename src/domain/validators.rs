//! Field validators run before any mutating operation.
//!
//! Each validator returns `Result<(), ValidationError>`; [`FieldErrors`]
//! collects the outcomes of several validators so a form can report every
//! offending field at once.

use serde::Serialize;
use thiserror::Error;

pub const REQUIRED_MESSAGE: &str = "Это поле необходимо заполнить";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
    /// The rejected input, kept for re-rendering the form.
    pub value: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            value: value.into(),
        }
    }
}

/// Reject the empty string. Any other value, including whitespace, passes.
pub fn validate_not_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, REQUIRED_MESSAGE, value));
    }
    Ok(())
}

/// Django-style slug: ASCII letters, digits, hyphens and underscores.
pub fn validate_slug(field: &'static str, value: &str) -> Result<(), ValidationError> {
    validate_not_empty(field, value)?;
    let valid = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(ValidationError::new(
            field,
            "Значение должно состоять только из латинских букв, цифр, знаков подчеркивания или дефиса.",
            value,
        ));
    }
    Ok(())
}

pub fn validate_max_chars(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let count = value.chars().count();
    if count > max {
        return Err(ValidationError::new(
            field,
            format!("Убедитесь, что это значение содержит не более {max} символов (сейчас {count})."),
            value,
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("form has {} invalid field(s)", .errors.len())]
pub struct FieldErrors {
    errors: Vec<ValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a validator; successes are ignored.
    pub fn check(&mut self, outcome: Result<(), ValidationError>) -> &mut Self {
        if let Err(error) = outcome {
            self.errors.push(error);
        }
        self
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|error| error.field == field)
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.get(field).map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for FieldErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}
