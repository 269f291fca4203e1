//! The `/api` transformation endpoint.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        classify::{Classification, Payload, classify},
        dispatch::Dispatcher,
        error::{ErrorReport, HttpError},
    },
    domain::{
        types::{Operation, OutputFormat},
        url::normalize,
    },
    presentation::{
        formats::FormatError,
        render::{RenderedResponse, render},
        views::{LayoutChrome, render_error_page_response},
    },
};

use super::HttpState;

pub const DOCS_PATH: &str = "/docs";

const SOURCE: &str = "infra::http::api::transform";

/// Raw query parameters. Empty values count as absent.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ApiQuery {
    pub method: Option<String>,
    pub url: Option<String>,
    pub output: Option<String>,
}

/// What the endpoint answers for one query.
#[derive(Debug)]
pub enum ApiReply {
    /// No `url` was supplied; the caller is sent to the documentation.
    Docs,
    Rendered {
        classification: Classification,
        response: RenderedResponse,
    },
}

/// Run one query through validation, dispatch, classification and rendering.
///
/// `output` is validated before `method`, so an unknown output is always
/// answered in html while an unknown method is answered in the requested format.
pub async fn answer(
    dispatcher: &Dispatcher,
    chrome: &LayoutChrome,
    query: ApiQuery,
) -> Result<ApiReply, FormatError> {
    let Some(raw_url) = query.url.filter(|value| !value.is_empty()) else {
        return Ok(ApiReply::Docs);
    };

    let format = match OutputFormat::resolve(query.output.as_deref()) {
        Ok(format) => format,
        Err(err) => return reply(Classification::from(err), OutputFormat::Html, chrome),
    };

    let operation = match Operation::resolve(query.method.as_deref()) {
        Ok(operation) => operation,
        Err(err) => return reply(Classification::from(err), format, chrome),
    };

    let url = normalize(&raw_url);
    let outcome = dispatcher.dispatch(operation, &url).await;
    reply(classify(outcome), format, chrome)
}

fn reply(
    classification: Classification,
    format: OutputFormat,
    chrome: &LayoutChrome,
) -> Result<ApiReply, FormatError> {
    let response = render(
        classification.status,
        &classification.payload,
        format,
        chrome,
    )?;
    Ok(ApiReply::Rendered {
        classification,
        response,
    })
}

pub(super) async fn transform(
    State(state): State<HttpState>,
    query: Result<Query<ApiQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return render_error_page_response(
                &state.chrome,
                StatusCode::BAD_REQUEST,
                SOURCE,
                rejection.body_text(),
            );
        }
    };

    match answer(&state.dispatcher, &state.chrome, query).await {
        Ok(ApiReply::Docs) => Redirect::temporary(DOCS_PATH).into_response(),
        Ok(ApiReply::Rendered {
            classification,
            response,
        }) => {
            let status = response.status;
            let mut response = response.into_response();
            if let Payload::Error { message } = classification.payload {
                ErrorReport::from_message(SOURCE, status, message).attach(&mut response);
            }
            response
        }
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Response rendering failed",
            &err,
        )
        .into_response(),
    }
}
