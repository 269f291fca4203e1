use thiserror::Error;

use super::engine::rules::RulesError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("tracking rules: {0}")]
    Rules(#[from] RulesError),
    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
