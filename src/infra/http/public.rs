use axum::{
    Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::HOST},
    response::Response,
    routing::get,
};

use crate::presentation::views::{
    DocsTemplate, DocsView, HomeView, IndexTemplate, LayoutContext, render_error_page_response,
    render_template_response,
};

use super::{HttpState, api::DOCS_PATH};

const API_PATH: &str = "/api";
const REDOC_PATH: &str = "/redoc";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/", get(home).post(home))
        .route(DOCS_PATH, get(docs))
        .route(REDOC_PATH, get(docs))
        .route("/_health", get(health))
        .route(
            "/static/public/{*path}",
            get(crate::infra::assets::serve_public),
        )
}

async fn home(State(state): State<HttpState>) -> Response {
    let view = LayoutContext::new(&state.chrome, HomeView::default());
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn docs(State(state): State<HttpState>) -> Response {
    let view = LayoutContext::new(&state.chrome, DocsView::new(API_PATH));
    render_template_response(DocsTemplate { view }, StatusCode::OK)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(super) async fn not_found(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let message = format!("error 404: page {} is not found.", full_url(&headers, &uri));
    render_error_page_response(
        &state.chrome,
        StatusCode::NOT_FOUND,
        "infra::http::public::not_found",
        message,
    )
}

pub(super) async fn method_not_allowed(
    State(state): State<HttpState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let message = format!(
        "error 405: method {method} is not allowed for {}.",
        full_url(&headers, &uri)
    );
    render_error_page_response(
        &state.chrome,
        StatusCode::METHOD_NOT_ALLOWED,
        "infra::http::public::method_not_allowed",
        message,
    )
}

/// `scheme://host/path` of the request, without the query.
fn full_url(headers: &HeaderMap, uri: &Uri) -> String {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let scheme = uri
        .scheme_str()
        .or_else(|| header(FORWARDED_PROTO))
        .unwrap_or("http");
    let host = header(HOST.as_str())
        .or_else(|| uri.host())
        .unwrap_or("localhost");
    format!("{scheme}://{host}{}", uri.path())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn full_url_defaults_to_http_on_localhost() {
        let uri: Uri = "/missing?x=1".parse().expect("uri");
        assert_eq!(full_url(&HeaderMap::new(), &uri), "http://localhost/missing");
    }

    #[test]
    fn full_url_keeps_the_request_scheme() {
        let uri: Uri = "https://unalix.example/missing".parse().expect("uri");
        assert_eq!(
            full_url(&HeaderMap::new(), &uri),
            "https://unalix.example/missing"
        );

        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("proxied.example"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https"));
        let uri: Uri = "/missing".parse().expect("uri");
        assert_eq!(full_url(&headers, &uri), "https://proxied.example/missing");
    }
}
