use std::{process, sync::Once};

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings, Settings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Log the effective runtime configuration once, before the listener accepts requests.
pub fn announce_startup(settings: &Settings) {
    let engine = &settings.engine;
    info!(
        target = "unalix_web::startup",
        app = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        addr = %settings.server.addr,
        http_timeout_secs = engine.http_timeout.as_secs(),
        deadline_secs = engine.deadline.as_secs(),
        max_redirects = engine.max_redirects.get(),
        follow_documents = engine.follow_documents,
        user_agent = %engine.user_agent,
        rules_file = engine
            .rules_file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
        "app started"
    );
}

pub fn announce_shutdown() {
    info!(target = "unalix_web::startup", "app stopped, bye.");
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "unalix_transform_total",
            Unit::Count,
            "Total number of dispatched transformations by operation and outcome."
        );
        describe_histogram!(
            "unalix_transform_ms",
            Unit::Milliseconds,
            "Transformation latency in milliseconds, including engine network time."
        );
    });
}
