use thiserror::Error;

use super::types::{Operation, OutputFormat};

/// Rejections raised while resolving request parameters, before any dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid method type, the supported method types are {supported}.", supported = Operation::supported())]
    Operation { value: String },
    #[error("invalid output type, the supported output types are {supported}.", supported = OutputFormat::supported())]
    Output { value: String },
}

impl ValidationError {
    pub fn operation(value: impl Into<String>) -> Self {
        Self::Operation {
            value: value.into(),
        }
    }

    pub fn output(value: impl Into<String>) -> Self {
        Self::Output {
            value: value.into(),
        }
    }

    /// The raw value the caller supplied.
    pub fn value(&self) -> &str {
        match self {
            ValidationError::Operation { value } | ValidationError::Output { value } => value,
        }
    }
}
