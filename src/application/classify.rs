//! Maps dispatch outcomes and validation rejections onto status codes and payloads.

use axum::http::StatusCode;

use crate::domain::error::ValidationError;

use super::dispatch::Outcome;

/// What a response carries, independent of its wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Success { new_url: String },
    Error { message: String },
}

impl Payload {
    pub fn success(new_url: impl Into<String>) -> Self {
        Self::Success {
            new_url: new_url.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: StatusCode,
    pub payload: Payload,
}

/// Partial results are still successes: a usable URL is never discarded.
pub fn classify(outcome: Outcome) -> Classification {
    match outcome {
        Outcome::Success(new_url) | Outcome::PartialSuccess(new_url) => Classification {
            status: StatusCode::OK,
            payload: Payload::success(new_url),
        },
        Outcome::Failure { message, .. } => Classification {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            payload: Payload::error(message),
        },
    }
}

impl From<ValidationError> for Classification {
    fn from(error: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            payload: Payload::error(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::FailureKind;

    #[test]
    fn success_and_partial_share_status_and_payload() {
        let full = classify(Outcome::Success("http://a".to_string()));
        let partial = classify(Outcome::PartialSuccess("http://a".to_string()));
        assert_eq!(full, partial);
        assert_eq!(full.status, StatusCode::OK);
        assert_eq!(full.payload, Payload::success("http://a"));
    }

    #[test]
    fn failures_are_server_errors() {
        for kind in [FailureKind::Engine, FailureKind::DeadlineExceeded] {
            let classification = classify(Outcome::Failure {
                kind,
                message: "boom".to_string(),
            });
            assert_eq!(classification.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(classification.payload, Payload::error("boom"));
        }
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let classification = Classification::from(ValidationError::operation("banana"));
        assert_eq!(classification.status, StatusCode::BAD_REQUEST);
        match classification.payload {
            Payload::Error { message } => assert!(message.starts_with("invalid method type")),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
