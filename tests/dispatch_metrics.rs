use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use tokio::time::Instant;
use unalix_web::application::dispatch::{DispatchOptions, Dispatcher, Outcome};
use unalix_web::application::engine::{EngineError, TransformEngine};
use unalix_web::domain::types::Operation;
use unalix_web::domain::url::{NormalizedUrl, normalize};

struct FixedEngine;

#[async_trait]
impl TransformEngine for FixedEngine {
    async fn unshort(
        &self,
        url: &NormalizedUrl,
        _follow_documents: bool,
        _deadline: Instant,
    ) -> Result<String, EngineError> {
        Err(EngineError::connect(url.as_str(), "connection reset"))
    }

    async fn clear(&self, url: &NormalizedUrl) -> Result<String, EngineError> {
        Ok(url.as_str().to_string())
    }
}

#[tokio::test]
async fn dispatch_records_outcome_labels_and_latency() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dispatcher = Dispatcher::new(
        Arc::new(FixedEngine),
        DispatchOptions {
            follow_documents: true,
            deadline: Duration::from_secs(1),
        },
    );
    let url = normalize("example.com");

    assert_eq!(
        dispatcher.dispatch(Operation::Clear, &url).await,
        Outcome::Success("http://example.com".to_string())
    );
    assert_eq!(
        dispatcher.dispatch(Operation::Unshort, &url).await,
        Outcome::PartialSuccess("http://example.com".to_string())
    );

    let mut names = HashSet::new();
    let mut outcomes = HashSet::new();
    for (composite_key, _, _, _) in snapshotter.snapshot().into_vec() {
        let key = composite_key.key();
        names.insert(key.name().to_string());
        if key.name() == "unalix_transform_total" {
            let labels: Vec<(String, String)> = key
                .labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect();
            outcomes.insert(labels);
        }
    }

    assert!(names.contains("unalix_transform_total"));
    assert!(names.contains("unalix_transform_ms"));
    assert!(outcomes.contains(&vec![
        ("operation".to_string(), "clear".to_string()),
        ("outcome".to_string(), "success".to_string()),
    ]));
    assert!(outcomes.contains(&vec![
        ("operation".to_string(), "unshort".to_string()),
        ("outcome".to_string(), "partial_success".to_string()),
    ]));
}
