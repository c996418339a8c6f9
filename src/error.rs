//! Error taxonomy of the editing pipeline.
//!
//! ```text
//! ProcessError
//! ├── Validation(ValidationError)   rejected before any render call
//! └── Render(RenderError)           reported by the Renderer
//! ```
//!
//! None of these are fatal: the controller stays usable after any of them.

use thiserror::Error;

/// Message used when a render failure carries nothing worth showing.
const GENERIC_FAILURE: &str = "Processing failed";

/// Content rejected by `Renderer::validate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Content exceeds maximum length of {max} characters")]
    ContentTooLarge { max: usize },

    #[error("Invalid character encoding")]
    InvalidEncoding,

    #[error("Content must be text")]
    InvalidInputType,
}

/// Failure reported by a render call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{0}")]
    ProcessingFailed(String),

    /// Collaborator failure of no particular shape.
    #[error("render failed: {0}")]
    Failed(String),
}

impl RenderError {
    /// Normalize a collaborator failure before it reaches shared state.
    ///
    /// Every failure becomes `ProcessingFailed`, keeping its message when it
    /// has one and falling back to the default message otherwise.
    pub fn normalize(self) -> Self {
        match self {
            Self::Failed(msg) | Self::ProcessingFailed(msg) => {
                if msg.trim().is_empty() {
                    Self::ProcessingFailed(GENERIC_FAILURE.to_string())
                } else {
                    Self::ProcessingFailed(msg)
                }
            }
        }
    }
}

/// Outcome error of one `process_content` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ProcessError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_too_large_message() {
        let err = ValidationError::ContentTooLarge { max: 100_000 };
        assert_eq!(
            err.to_string(),
            "Content exceeds maximum length of 100000 characters"
        );
    }

    #[test]
    fn test_process_error_is_transparent() {
        let err = ProcessError::from(ValidationError::InvalidEncoding);
        assert_eq!(err.to_string(), "Invalid character encoding");
        assert!(err.is_validation());

        let err = ProcessError::from(RenderError::ProcessingFailed("boom".into()));
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_normalize_empty_failure() {
        let err = RenderError::Failed(String::new()).normalize();
        assert_eq!(err, RenderError::ProcessingFailed("Processing failed".into()));
    }

    #[test]
    fn test_normalize_keeps_message() {
        let err = RenderError::Failed("parser stalled".into()).normalize();
        assert_eq!(err, RenderError::ProcessingFailed("parser stalled".into()));
        assert_eq!(err.to_string(), "parser stalled");

        let err = RenderError::ProcessingFailed("  ".into()).normalize();
        assert_eq!(err, RenderError::ProcessingFailed("Processing failed".into()));
    }
}
