//! Content validation run before any render call.

use crate::error::ValidationError;

/// Outcome of validating one content snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub const fn fail(error: ValidationError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Check the length limit. Length counts Unicode scalar values.
pub fn validate_text(content: &str, max_length: usize) -> ValidationResult {
    // Byte length is an upper bound on the char count; skip the count when it fits.
    if content.len() > max_length && content.chars().count() > max_length {
        return ValidationResult::fail(ValidationError::ContentTooLarge { max: max_length });
    }
    ValidationResult::ok()
}

/// Decode raw bytes (e.g. a file read from disk) into editable text.
///
/// NUL bytes mark binary input; anything else must be valid UTF-8.
pub fn decode_content(bytes: Vec<u8>) -> Result<String, ValidationError> {
    if bytes.contains(&0) {
        return Err(ValidationError::InvalidInputType);
    }
    String::from_utf8(bytes).map_err(|_| ValidationError::InvalidEncoding)
}
