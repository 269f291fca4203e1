//! Contract between the dispatcher and whatever performs URL transformations.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::domain::url::NormalizedUrl;

/// Failures a transformation engine can report.
///
/// `Connect` is the only kind that still carries a usable URL: the walk reached
/// `url` before the network gave out. `Unreachable` is the same stop on the
/// first request, when nothing was discovered yet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("ConnectError: {message}")]
    Connect { url: String, message: String },
    #[error("ConnectError: {message}")]
    Unreachable { url: String, message: String },
    #[error("InvalidURL: `{url}` could not be parsed: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("UnsupportedProtocol: scheme `{scheme}` is not supported")]
    UnsupportedScheme { scheme: String },
    #[error("TooManyRedirects: exceeded the limit of {limit} redirects")]
    TooManyRedirects { limit: usize },
    #[error("HTTPError: {message}")]
    Http { message: String },
}

impl EngineError {
    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn unreachable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// The best-effort URL recovered before the failure, if any.
    pub fn partial_url(&self) -> Option<&str> {
        match self {
            EngineError::Connect { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }
}

/// The two capabilities the endpoint can invoke.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Resolve the redirect chain starting at `url`, optionally inspecting HTML
    /// documents for refresh and canonical hints.
    ///
    /// Once `deadline` passes the walk stops and reports the last URL it
    /// reached as `EngineError::Connect`.
    async fn unshort(
        &self,
        url: &NormalizedUrl,
        follow_documents: bool,
        deadline: Instant,
    ) -> Result<String, EngineError>;

    /// Strip tracking fields from `url` without touching the network.
    async fn clear(&self, url: &NormalizedUrl) -> Result<String, EngineError>;
}
