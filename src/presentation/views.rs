use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::error::{ErrorReport, HttpError},
    config::SiteSettings,
    domain::types::{Operation, OutputFormat},
};

use super::formats;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the html error page with `status`, attaching a report for the response logger.
pub fn render_error_page_response(
    chrome: &LayoutChrome,
    status: StatusCode,
    source: &'static str,
    message: String,
) -> Response {
    let content = ErrorPageView::new(status, message.clone());
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    ErrorReport::from_message(source, status, message).attach(&mut response);
    response
}

/// Site-wide values shared by every page.
#[derive(Debug, Clone, Default)]
pub struct LayoutChrome {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl LayoutChrome {
    pub fn new(site: &SiteSettings) -> Self {
        Self {
            title: site.title.clone(),
            description: site.description.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct LayoutContext<'a, T> {
    pub chrome: &'a LayoutChrome,
    pub content: T,
}

impl<'a, T> LayoutContext<'a, T> {
    pub fn new(chrome: &'a LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

pub struct ChoiceView {
    pub value: &'static str,
    pub selected: bool,
}

pub struct HomeView {
    pub operations: Vec<ChoiceView>,
    pub formats: Vec<ChoiceView>,
}

impl Default for HomeView {
    fn default() -> Self {
        let default_op = Operation::default();
        let default_format = OutputFormat::default();
        Self {
            operations: Operation::ALL
                .into_iter()
                .map(|op| ChoiceView {
                    value: op.as_str(),
                    selected: op == default_op,
                })
                .collect(),
            formats: OutputFormat::ALL
                .into_iter()
                .map(|format| ChoiceView {
                    value: format.as_str(),
                    selected: format == default_format,
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub view: LayoutContext<'a, HomeView>,
}

pub struct FormatDocView {
    pub name: &'static str,
    pub content_type: &'static str,
    pub success_example: String,
}

pub struct DocsView {
    pub endpoint: &'static str,
    pub operations: Vec<&'static str>,
    pub default_operation: &'static str,
    pub default_format: &'static str,
    pub formats: Vec<FormatDocView>,
}

impl DocsView {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            operations: Operation::ALL.iter().map(|op| op.as_str()).collect(),
            default_operation: Operation::default().as_str(),
            default_format: OutputFormat::default().as_str(),
            formats: formats::catalog(),
        }
    }
}

#[derive(Template)]
#[template(path = "docs.html")]
pub struct DocsTemplate<'a> {
    pub view: LayoutContext<'a, DocsView>,
}

pub struct ResultView<'a> {
    pub new_url: &'a str,
}

#[derive(Template)]
#[template(path = "success.html")]
pub struct SuccessTemplate<'a> {
    pub view: LayoutContext<'a, ResultView<'a>>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

impl ErrorPageView {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error"),
            message,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub view: LayoutContext<'a, ErrorPageView>,
}
