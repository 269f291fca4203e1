//! Transformation dispatch: exactly one engine call per request, bounded by a deadline.

use std::{sync::Arc, time::Duration};

use metrics::{counter, histogram};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::{
    config::EngineSettings,
    domain::{types::Operation, url::NormalizedUrl},
};

use super::engine::{EngineError, TransformEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Engine,
    DeadlineExceeded,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Engine => "engine_error",
            FailureKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Terminal result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    /// The engine gave up mid-walk but surfaced the last URL it reached.
    PartialSuccess(String),
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::PartialSuccess(_) => "partial_success",
            Outcome::Failure { kind, .. } => kind.as_str(),
        }
    }
}

impl From<EngineError> for Outcome {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Connect { url, .. } => Outcome::PartialSuccess(url),
            other => Outcome::Failure {
                kind: FailureKind::Engine,
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub follow_documents: bool,
    pub deadline: Duration,
}

impl From<&EngineSettings> for DispatchOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            follow_documents: settings.follow_documents,
            deadline: settings.deadline,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<dyn TransformEngine>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn TransformEngine>, options: DispatchOptions) -> Self {
        Self { engine, options }
    }

    /// Invoke the engine operation selected by `op`. Never retries.
    ///
    /// The engine receives the same deadline as the outer timeout.
    pub async fn dispatch(&self, op: Operation, url: &NormalizedUrl) -> Outcome {
        let started = Instant::now();
        let deadline = started + self.options.deadline;
        let call = async {
            match op {
                Operation::Unshort => {
                    self.engine
                        .unshort(url, self.options.follow_documents, deadline)
                        .await
                }
                Operation::Clear => self.engine.clear(url).await,
            }
        };

        let outcome = match timeout_at(deadline, call).await {
            Ok(Ok(new_url)) => Outcome::Success(new_url),
            Ok(Err(error)) => {
                if let Some(partial) = error.partial_url() {
                    warn!(
                        target = "unalix_web::dispatch",
                        operation = %op,
                        url = %url,
                        partial = partial,
                        error = %error,
                        "engine stopped early, using best-effort url"
                    );
                }
                Outcome::from(error)
            }
            Err(_) => Outcome::Failure {
                kind: FailureKind::DeadlineExceeded,
                message: format!(
                    "TimeoutError: transformation did not finish within {} seconds",
                    self.options.deadline.as_secs_f64()
                ),
            },
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        counter!(
            "unalix_transform_total",
            "operation" => op.as_str(),
            "outcome" => outcome.label()
        )
        .increment(1);
        histogram!("unalix_transform_ms", "operation" => op.as_str()).record(elapsed_ms);
        debug!(
            target = "unalix_web::dispatch",
            operation = %op,
            url = %url,
            outcome = outcome.label(),
            elapsed_ms,
            "dispatch finished"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::url::normalize;

    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<String>>,
        unshort_result: Option<Result<String, EngineError>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl TransformEngine for RecordingEngine {
        async fn unshort(
            &self,
            url: &NormalizedUrl,
            follow_documents: bool,
            _deadline: Instant,
        ) -> Result<String, EngineError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(format!("unshort:{url}:{follow_documents}"));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.unshort_result
                .clone()
                .unwrap_or_else(|| Ok(url.to_string()))
        }

        async fn clear(&self, url: &NormalizedUrl) -> Result<String, EngineError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(format!("clear:{url}"));
            Ok(format!("{url}/cleared"))
        }
    }

    fn options() -> DispatchOptions {
        DispatchOptions {
            follow_documents: true,
            deadline: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn clear_invokes_only_the_clear_operation() {
        let engine = Arc::new(RecordingEngine::default());
        let dispatcher = Dispatcher::new(engine.clone(), options());

        let outcome = dispatcher
            .dispatch(Operation::Clear, &normalize("example.com"))
            .await;

        assert_eq!(
            outcome,
            Outcome::Success("http://example.com/cleared".to_string())
        );
        assert_eq!(
            *engine.calls.lock().expect("calls lock"),
            vec!["clear:http://example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn unshort_passes_document_flag() {
        let engine = Arc::new(RecordingEngine::default());
        let dispatcher = Dispatcher::new(
            engine.clone(),
            DispatchOptions {
                follow_documents: false,
                ..options()
            },
        );

        dispatcher
            .dispatch(Operation::Unshort, &normalize("http://short.ly/a"))
            .await;

        assert_eq!(
            *engine.calls.lock().expect("calls lock"),
            vec!["unshort:http://short.ly/a:false".to_string()]
        );
    }

    #[tokio::test]
    async fn connect_errors_become_partial_success() {
        let engine = Arc::new(RecordingEngine {
            unshort_result: Some(Err(EngineError::connect(
                "http://real-site.com",
                "timed out",
            ))),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(engine, options());

        let outcome = dispatcher
            .dispatch(Operation::Unshort, &normalize("http://short.ly/abc"))
            .await;

        assert_eq!(
            outcome,
            Outcome::PartialSuccess("http://real-site.com".to_string())
        );
    }

    #[tokio::test]
    async fn other_errors_forward_the_engine_message() {
        let error = EngineError::TooManyRedirects { limit: 3 };
        let expected = error.to_string();
        let engine = Arc::new(RecordingEngine {
            unshort_result: Some(Err(error)),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(engine, options());

        let outcome = dispatcher
            .dispatch(Operation::Unshort, &normalize("http://x"))
            .await;

        assert_eq!(
            outcome,
            Outcome::Failure {
                kind: FailureKind::Engine,
                message: expected,
            }
        );
    }

    #[tokio::test]
    async fn slow_engines_hit_the_deadline() {
        let engine = Arc::new(RecordingEngine {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(
            engine,
            DispatchOptions {
                follow_documents: true,
                deadline: Duration::from_millis(20),
            },
        );

        let outcome = dispatcher
            .dispatch(Operation::Unshort, &normalize("http://slow"))
            .await;

        match outcome {
            Outcome::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::DeadlineExceeded);
                assert!(message.starts_with("TimeoutError"));
            }
            other => panic!("expected deadline failure, got {other:?}"),
        }
    }

    struct DeadlineAwareEngine;

    #[async_trait]
    impl TransformEngine for DeadlineAwareEngine {
        async fn unshort(
            &self,
            _url: &NormalizedUrl,
            _follow_documents: bool,
            deadline: Instant,
        ) -> Result<String, EngineError> {
            tokio::time::sleep_until(deadline).await;
            Err(EngineError::connect(
                "http://reached.example/",
                "deadline elapsed",
            ))
        }

        async fn clear(&self, url: &NormalizedUrl) -> Result<String, EngineError> {
            Ok(url.to_string())
        }
    }

    #[tokio::test]
    async fn engines_reporting_at_the_deadline_keep_their_partial_url() {
        let dispatcher = Dispatcher::new(
            Arc::new(DeadlineAwareEngine),
            DispatchOptions {
                follow_documents: true,
                deadline: Duration::from_millis(50),
            },
        );

        let outcome = dispatcher
            .dispatch(Operation::Unshort, &normalize("http://short.ly/abc"))
            .await;

        assert_eq!(
            outcome,
            Outcome::PartialSuccess("http://reached.example/".to_string())
        );
    }
}
