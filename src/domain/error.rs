use thiserror::Error;

/// Construction-time validation failures for domain values and drafts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid access level '{value}': expected one of {expected}")]
    InvalidAccessLevel {
        value: String,
        expected: &'static str,
    },

    #[error("Invalid {kind} '{value}': expected one of {expected}")]
    InvalidChoice {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn choice(kind: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        ValidationError::InvalidChoice {
            kind,
            value: value.into(),
            expected,
        }
    }
}

/// Checks a required text field against an inclusive character-count range.
pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::field(
            field,
            format!("must be between {} and {} characters long", min, max),
        ));
    }
    Ok(())
}

/// Checks an optional text field against a maximum character count.
pub(crate) fn check_max_length(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::field(
            field,
            format!("must not exceed {} characters", max),
        )),
        _ => Ok(()),
    }
}
