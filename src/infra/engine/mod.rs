//! Network-backed transformation engine.

pub mod document;
pub mod rules;

use std::{collections::HashSet, future::Future};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header, redirect::Policy};
use tokio::time::{Instant, timeout_at};
use tracing::debug;
use url::Url;

use crate::{
    application::engine::{EngineError, TransformEngine},
    config::EngineSettings,
    domain::url::NormalizedUrl,
};

use self::{document::extract_hints, rules::Rules};
use super::error::InfraError;

const LOG_TARGET: &str = "unalix_web::engine";

/// Engine that walks redirect chains over HTTP and clears URLs with [`Rules`].
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    rules: Rules,
    max_redirects: usize,
    max_document_bytes: u64,
}

impl HttpEngine {
    /// Build the engine, loading the configured rules file on top of the built-ins.
    pub fn new(settings: &EngineSettings) -> Result<Self, InfraError> {
        let rules = Rules::load(settings.rules_file.as_deref())?;
        debug!(
            target = LOG_TARGET,
            providers = rules.provider_count(),
            "tracking rules loaded"
        );
        Self::with_rules(settings, rules)
    }

    pub fn with_rules(settings: &EngineSettings, rules: Rules) -> Result<Self, InfraError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(settings.http_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            rules,
            max_redirects: settings.max_redirects.get(),
            max_document_bytes: settings.max_document_bytes.get(),
        })
    }

    fn clear_str(&self, raw: &str) -> Result<String, EngineError> {
        self.rules.clear(raw, self.max_redirects)
    }

    /// Read at most `max_document_bytes` of an HTML body.
    async fn read_document(&self, mut response: Response) -> Result<String, reqwest::Error> {
        let limit = usize::try_from(self.max_document_bytes).unwrap_or(usize::MAX);
        let mut body = Vec::new();

        while body.len() < limit {
            let Some(chunk) = response.chunk().await? else {
                break;
            };
            let take = chunk.len().min(limit - body.len());
            body.extend_from_slice(&chunk[..take]);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl TransformEngine for HttpEngine {
    async fn unshort(
        &self,
        url: &NormalizedUrl,
        follow_documents: bool,
        deadline: Instant,
    ) -> Result<String, EngineError> {
        let mut current = self.clear_str(url.as_str())?;
        let mut visited = HashSet::new();
        let mut hops = 0usize;

        loop {
            visited.insert(current.clone());
            let response = bounded(
                deadline,
                &current,
                hops > 0,
                self.client.get(current.as_str()).send(),
            )
            .await?;
            let status = response.status();

            let next = if status.is_redirection() {
                match redirect_target(&current, &response)? {
                    Some(location) => Some(self.clear_str(&location)?),
                    None => None,
                }
            } else if follow_documents && status == StatusCode::OK && is_html(&response) {
                let body =
                    bounded(deadline, &current, true, self.read_document(response)).await?;
                extract_hints(&body)
                    .next()
                    .and_then(|hint| resolve(&current, hint).ok())
                    .and_then(|hint| self.clear_str(&hint).ok())
                    .filter(|hint| !visited.contains(hint))
            } else {
                None
            };

            let Some(next) = next else {
                debug!(target = LOG_TARGET, url = %current, hops, "walk finished");
                return Ok(current);
            };

            hops += 1;
            if hops > self.max_redirects {
                return Err(EngineError::TooManyRedirects {
                    limit: self.max_redirects,
                });
            }

            debug!(
                target = LOG_TARGET,
                from = %current,
                to = %next,
                status = status.as_u16(),
                "following hop"
            );
            current = next;
        }
    }

    async fn clear(&self, url: &NormalizedUrl) -> Result<String, EngineError> {
        self.clear_str(url.as_str())
    }
}

fn redirect_target(current: &str, response: &Response) -> Result<Option<String>, EngineError> {
    let Some(location) = response.headers().get(header::LOCATION) else {
        return Ok(None);
    };
    let location = location
        .to_str()
        .map_err(|err| EngineError::invalid_url(current, err))?;
    resolve(current, location).map(Some)
}

fn resolve(base: &str, reference: &str) -> Result<String, EngineError> {
    let base = Url::parse(base).map_err(|err| EngineError::invalid_url(base, err))?;
    base.join(reference.trim())
        .map(String::from)
        .map_err(|err| EngineError::invalid_url(reference, err))
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            let value = value.to_ascii_lowercase();
            value.starts_with("text/html") || value.starts_with("application/xhtml+xml")
        })
}

/// Run one network step of the walk until `deadline`.
///
/// When `reached` is set, `current` was already discovered or answered and is
/// kept as the best-effort result. Otherwise the stop is final.
async fn bounded<T>(
    deadline: Instant,
    current: &str,
    reached: bool,
    step: impl Future<Output = Result<T, reqwest::Error>>,
) -> Result<T, EngineError> {
    let reason = match timeout_at(deadline, step).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) if err.is_builder() => return Err(EngineError::invalid_url(current, err)),
        Ok(Err(err)) if err.is_timeout() => format!("timed out while requesting {current}"),
        Ok(Err(err)) => format!("could not complete request to {current}: {err}"),
        Err(_) => format!("deadline elapsed while requesting {current}"),
    };

    debug!(target = LOG_TARGET, url = %current, reached, %reason, "walk stopped");
    if reached {
        Err(EngineError::connect(current, reason))
    } else {
        Err(EngineError::unreachable(current, reason))
    }
}
