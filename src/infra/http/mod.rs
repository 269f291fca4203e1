pub mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::{application::dispatch::Dispatcher, presentation::views::LayoutChrome};

use self::middleware::{log_responses, set_request_context};

pub use api::{ApiQuery, ApiReply, answer};
pub use middleware::REQUEST_ID_HEADER;

/// Read-only state shared by every handler.
#[derive(Clone)]
pub struct HttpState {
    pub dispatcher: Arc<Dispatcher>,
    pub chrome: Arc<LayoutChrome>,
}

impl HttpState {
    pub fn new(dispatcher: Dispatcher, chrome: LayoutChrome) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            chrome: Arc::new(chrome),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api", get(api::transform).post(api::transform))
        .merge(public::routes())
        .fallback(public::not_found)
        .method_not_allowed_fallback(public::method_not_allowed)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
