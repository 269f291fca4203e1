//! Response rendering through the format registry.

use axum::{
    body::Body,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::{application::classify::Payload, domain::types::OutputFormat};

use super::{
    formats::{self, FormatError, Serialized},
    views::LayoutChrome,
};

/// Status, content type and body of one answer, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub location: Option<String>,
    pub body: Bytes,
}

/// Serialize `payload` in `format`. Deterministic for a fixed input.
///
/// Redirect serializations force 307; bare ones keep `status` with no body.
pub fn render(
    status: StatusCode,
    payload: &Payload,
    format: OutputFormat,
    chrome: &LayoutChrome,
) -> Result<RenderedResponse, FormatError> {
    let entry = formats::lookup(format);
    let serialized = match payload {
        Payload::Success { new_url } => (entry.success)(chrome, new_url)?,
        Payload::Error { message } => (entry.error)(chrome, status, message)?,
    };

    let rendered = match serialized {
        Serialized::Body(body) => RenderedResponse {
            status,
            content_type: entry.content_type,
            location: None,
            body: Bytes::from(body),
        },
        Serialized::Redirect(location) => RenderedResponse {
            status: StatusCode::TEMPORARY_REDIRECT,
            content_type: None,
            location: Some(location),
            body: Bytes::new(),
        },
        Serialized::Bare => RenderedResponse {
            status,
            content_type: None,
            location: None,
            body: Bytes::new(),
        },
    };

    Ok(rendered)
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        if let Some(location) = self.location {
            match HeaderValue::try_from(location) {
                Ok(value) => {
                    response.headers_mut().insert(LOCATION, value);
                }
                Err(_) => {
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    *response.body_mut() = Body::empty();
                }
            }
        }

        response
    }
}
