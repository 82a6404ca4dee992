use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// Core pipeline error type

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Image payload is empty")]
    EmptyInput,
    #[error("Image payload of {size} bytes exceeds the {limit} byte ceiling")]
    OversizeInput { size: usize, limit: usize },
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to render heatmap: {0}")]
    Render(String),
    #[error("Out of memory while {stage}: {detail}")]
    ResourceExhausted { stage: &'static str, detail: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn exhausted(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            stage,
            detail: detail.into(),
        }
    }
}

// Boundary error type seen by the upload handler and the CLI

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("No image was uploaded")]
    MissingImage,
    #[error("Unknown crop type: {0}")]
    UnknownCropType(String),
    #[error("No calculation record with id {0}")]
    NotFound(Uuid),
    #[error("Calculation did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Calculation worker failed: {0}")]
    Worker(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Fixed code that is safe to show to an end user. Never carries the
    /// internal error text.
    pub fn user_code(&self) -> &'static str {
        match self {
            AppError::MissingImage => "NoImage",
            AppError::Pipeline(PipelineError::EmptyInput) => "EmptyImage",
            AppError::Pipeline(PipelineError::OversizeInput { .. }) => "ImageTooLarge",
            AppError::Pipeline(PipelineError::Decode(_)) => "InvalidImage",
            AppError::UnknownCropType(_) => "UnknownCropType",
            AppError::NotFound(_) => "NotFound",
            _ if self.is_transient() => "Overloaded",
            _ => "CalculationFailed",
        }
    }

    /// Overload conditions the caller may retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Pipeline(PipelineError::ResourceExhausted { .. })
                | AppError::Timeout(_)
                | AppError::Worker(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_codes_do_not_leak_details() {
        let err = AppError::from(PipelineError::Render("encoder exploded at 0xdeadbeef".into()));
        assert_eq!(err.user_code(), "CalculationFailed");

        let err = AppError::Worker("thread 'blocking-1' panicked".into());
        assert_eq!(err.user_code(), "Overloaded");
        assert!(err.is_transient());

        let err = AppError::from(PipelineError::OversizeInput {
            size: 11,
            limit: 10,
        });
        assert_eq!(err.user_code(), "ImageTooLarge");
        assert!(!err.is_transient());
    }

    #[test]
    fn resource_exhaustion_is_transient() {
        let err = AppError::from(PipelineError::exhausted("segmenting", "labels"));
        assert!(err.is_transient());
        assert_eq!(err.user_code(), "Overloaded");
    }
}
