//! Format registry: one entry per output format, each pairing a success and an
//! error serializer with the content type they produce.
//!
//! The dispatcher and classifier never see a format; adding one means adding an
//! [`OutputFormat`] variant and a single entry here.

use std::io;

use askama::Template;
use axum::http::StatusCode;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesText, Event},
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::types::OutputFormat;

use super::views::{
    ErrorPageView, ErrorTemplate, FormatDocView, LayoutChrome, LayoutContext, ResultView,
    SuccessTemplate,
};

const SUCCESS_FIELD: &str = "new_url";
const ERROR_FIELD: &str = "exception";
const XML_ROOT: &str = "response";
const JSONP_CALLBACK: &str = "response";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("xml serialization failed: {0}")]
    Xml(#[from] io::Error),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// What a serializer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serialized {
    Body(Vec<u8>),
    /// Answer with a temporary redirect to the given location and no body.
    Redirect(String),
    /// Answer with the bare status: no body, no content type.
    Bare,
}

pub type SuccessSerializer = fn(&LayoutChrome, &str) -> Result<Serialized, FormatError>;
pub type ErrorSerializer = fn(&LayoutChrome, StatusCode, &str) -> Result<Serialized, FormatError>;

pub struct FormatEntry {
    pub format: OutputFormat,
    pub content_type: Option<&'static str>,
    pub success: SuccessSerializer,
    pub error: ErrorSerializer,
}

#[derive(Serialize)]
struct SuccessDocument<'a> {
    new_url: &'a str,
}

#[derive(Serialize)]
struct ErrorDocument<'a> {
    exception: &'a str,
}

static HTML: FormatEntry = FormatEntry {
    format: OutputFormat::Html,
    content_type: Some("text/html; charset=utf-8"),
    success: html_success,
    error: html_error,
};

static JSON: FormatEntry = FormatEntry {
    format: OutputFormat::Json,
    content_type: Some("application/json"),
    success: |_, new_url| Ok(Serialized::Body(serde_json::to_vec(&SuccessDocument { new_url })?)),
    error: |_, _, message| {
        Ok(Serialized::Body(serde_json::to_vec(&ErrorDocument {
            exception: message,
        })?))
    },
};

static JSONP: FormatEntry = FormatEntry {
    format: OutputFormat::Jsonp,
    content_type: Some("application/javascript"),
    success: |_, new_url| jsonp(&SuccessDocument { new_url }),
    error: |_, _, message| jsonp(&ErrorDocument { exception: message }),
};

static XML: FormatEntry = FormatEntry {
    format: OutputFormat::Xml,
    content_type: Some("application/xml"),
    success: |_, new_url| xml(SUCCESS_FIELD, new_url),
    error: |_, _, message| xml(ERROR_FIELD, message),
};

static YAML: FormatEntry = FormatEntry {
    format: OutputFormat::Yaml,
    content_type: Some("application/yaml"),
    success: |_, new_url| {
        Ok(Serialized::Body(
            serde_yaml::to_string(&SuccessDocument { new_url })?.into_bytes(),
        ))
    },
    error: |_, _, message| {
        Ok(Serialized::Body(
            serde_yaml::to_string(&ErrorDocument { exception: message })?.into_bytes(),
        ))
    },
};

static TOML: FormatEntry = FormatEntry {
    format: OutputFormat::Toml,
    content_type: Some("application/toml"),
    success: |_, new_url| {
        Ok(Serialized::Body(
            toml::to_string(&SuccessDocument { new_url })?.into_bytes(),
        ))
    },
    error: |_, _, message| {
        Ok(Serialized::Body(
            toml::to_string(&ErrorDocument { exception: message })?.into_bytes(),
        ))
    },
};

static TEXT: FormatEntry = FormatEntry {
    format: OutputFormat::Text,
    content_type: Some("text/plain; charset=utf-8"),
    success: |_, new_url| Ok(Serialized::Body(new_url.as_bytes().to_vec())),
    error: |_, _, message| Ok(Serialized::Body(message.as_bytes().to_vec())),
};

static REDIRECT: FormatEntry = FormatEntry {
    format: OutputFormat::Redirect,
    content_type: None,
    success: |_, new_url| Ok(Serialized::Redirect(new_url.to_string())),
    error: |_, _, _| Ok(Serialized::Bare),
};

/// Look up the registry entry for `format`. Exhaustive, so every format has one.
pub fn lookup(format: OutputFormat) -> &'static FormatEntry {
    match format {
        OutputFormat::Html => &HTML,
        OutputFormat::Json => &JSON,
        OutputFormat::Jsonp => &JSONP,
        OutputFormat::Xml => &XML,
        OutputFormat::Yaml => &YAML,
        OutputFormat::Toml => &TOML,
        OutputFormat::Text => &TEXT,
        OutputFormat::Redirect => &REDIRECT,
    }
}

/// Describe every format for the documentation page.
pub fn catalog() -> Vec<FormatDocView> {
    OutputFormat::ALL
        .into_iter()
        .map(|format| {
            let entry = lookup(format);
            let success_example = match format {
                OutputFormat::Html => "success page".to_string(),
                OutputFormat::Redirect => "307 with Location header".to_string(),
                _ => match (entry.success)(&LayoutChrome::default(), "https://example.com/") {
                    Ok(Serialized::Body(body)) => String::from_utf8_lossy(&body).into_owned(),
                    _ => String::new(),
                },
            };
            FormatDocView {
                name: format.as_str(),
                content_type: entry.content_type.unwrap_or("none"),
                success_example,
            }
        })
        .collect()
}

fn html_success(chrome: &LayoutChrome, new_url: &str) -> Result<Serialized, FormatError> {
    let view = LayoutContext::new(chrome, ResultView { new_url });
    Ok(Serialized::Body(SuccessTemplate { view }.render()?.into_bytes()))
}

fn html_error(
    chrome: &LayoutChrome,
    status: StatusCode,
    message: &str,
) -> Result<Serialized, FormatError> {
    let view = LayoutContext::new(chrome, ErrorPageView::new(status, message.to_string()));
    Ok(Serialized::Body(ErrorTemplate { view }.render()?.into_bytes()))
}

fn jsonp<T: Serialize>(document: &T) -> Result<Serialized, FormatError> {
    let json = serde_json::to_string(document)?;
    Ok(Serialized::Body(
        format!("{JSONP_CALLBACK}({json})").into_bytes(),
    ))
}

fn xml(field: &str, value: &str) -> Result<Serialized, FormatError> {
    let mut buf = Vec::with_capacity(128);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element(XML_ROOT).write_inner_content(|w| {
        w.create_element(field)
            .write_text_content(BytesText::new(value))?;
        Ok(())
    })?;

    Ok(Serialized::Body(buf))
}

#[cfg(test)]
mod tests {
    use quick_xml::Reader;

    use super::*;

    fn chrome() -> LayoutChrome {
        LayoutChrome {
            title: "Unalix-web".to_string(),
            description: "test".to_string(),
            version: "0.0.0".to_string(),
        }
    }

    fn body(serialized: Serialized) -> String {
        match serialized {
            Serialized::Body(bytes) => String::from_utf8(bytes).expect("utf-8 body"),
            other => panic!("expected a body, got {other:?}"),
        }
    }

    fn xml_text(document: &str, element: &str) -> Option<String> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);
        let mut inside = false;
        loop {
            match reader.read_event().expect("well-formed xml") {
                Event::Start(start) => {
                    inside = start.name().as_ref() == element.as_bytes();
                }
                Event::Text(text) if inside => {
                    let decoded = text.decode().expect("decodable text");
                    return Some(
                        quick_xml::escape::unescape(&decoded)
                            .expect("unescapable text")
                            .into_owned(),
                    );
                }
                Event::Eof => return None,
                _ => {}
            }
        }
    }

    #[test]
    fn every_format_has_a_matching_entry() {
        for format in OutputFormat::ALL {
            assert_eq!(lookup(format).format, format);
        }
    }

    #[test]
    fn json_round_trips() {
        let entry = lookup(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&body((entry.success)(&chrome(), "http://x").expect("json")))
                .expect("valid json");
        assert_eq!(value, serde_json::json!({ "new_url": "http://x" }));

        let value: serde_json::Value = serde_json::from_str(&body(
            (entry.error)(&chrome(), StatusCode::INTERNAL_SERVER_ERROR, "boom").expect("json"),
        ))
        .expect("valid json");
        assert_eq!(value, serde_json::json!({ "exception": "boom" }));
    }

    /// Success and error bodies of `format`, decoded by `parse`.
    fn both_payloads(
        format: OutputFormat,
        parse: impl Fn(&str) -> serde_json::Value,
    ) -> (serde_json::Value, serde_json::Value) {
        let entry = lookup(format);
        let success = body((entry.success)(&chrome(), "http://x").expect("success body"));
        let error = body(
            (entry.error)(&chrome(), StatusCode::INTERNAL_SERVER_ERROR, "boom")
                .expect("error body"),
        );
        (parse(&success), parse(&error))
    }

    #[test]
    fn jsonp_wraps_valid_json() {
        let (success, error) = both_payloads(OutputFormat::Jsonp, |text| {
            let inner = text
                .strip_prefix("response(")
                .and_then(|rest| rest.strip_suffix(')'))
                .expect("callback wrapper");
            serde_json::from_str(inner).expect("valid json")
        });
        assert_eq!(success, serde_json::json!({ "new_url": "http://x" }));
        assert_eq!(error, serde_json::json!({ "exception": "boom" }));
    }

    #[test]
    fn xml_round_trips() {
        let document = body((lookup(OutputFormat::Xml).success)(&chrome(), "http://x").expect("xml"));
        assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml_text(&document, "new_url").as_deref(), Some("http://x"));

        let document = body(
            (lookup(OutputFormat::Xml).error)(&chrome(), StatusCode::BAD_REQUEST, "boom")
                .expect("xml"),
        );
        assert_eq!(xml_text(&document, "exception").as_deref(), Some("boom"));
    }

    #[test]
    fn xml_escapes_markup() {
        let document = body(
            (lookup(OutputFormat::Xml).error)(&chrome(), StatusCode::BAD_REQUEST, "<b>")
                .expect("xml"),
        );
        assert!(document.contains("&lt;b&gt;"));
    }

    #[test]
    fn yaml_round_trips() {
        let (success, error) = both_payloads(OutputFormat::Yaml, |text| {
            serde_yaml::from_str(text).expect("valid yaml")
        });
        assert_eq!(success, serde_json::json!({ "new_url": "http://x" }));
        assert_eq!(error, serde_json::json!({ "exception": "boom" }));
    }

    #[test]
    fn toml_round_trips() {
        let (success, error) = both_payloads(OutputFormat::Toml, |text| {
            toml::from_str(text).expect("valid toml")
        });
        assert_eq!(success, serde_json::json!({ "new_url": "http://x" }));
        assert_eq!(error, serde_json::json!({ "exception": "boom" }));
    }

    #[test]
    fn text_is_the_bare_value() {
        let entry = lookup(OutputFormat::Text);
        assert_eq!(body((entry.success)(&chrome(), "http://x").expect("text")), "http://x");
        assert_eq!(
            body((entry.error)(&chrome(), StatusCode::INTERNAL_SERVER_ERROR, "boom").expect("text")),
            "boom"
        );
    }

    #[test]
    fn html_pages_carry_the_value() {
        let entry = lookup(OutputFormat::Html);
        let page = body((entry.success)(&chrome(), "http://x").expect("html"));
        assert!(page.contains("http://x"));
        assert!(page.contains("Unalix-web"));

        let page = body(
            (entry.error)(&chrome(), StatusCode::INTERNAL_SERVER_ERROR, "boom").expect("html"),
        );
        assert!(page.contains("boom"));
        assert!(page.contains("500"));
    }

    #[test]
    fn redirect_has_no_body() {
        let entry = lookup(OutputFormat::Redirect);
        assert_eq!(entry.content_type, None);
        assert_eq!(
            (entry.success)(&chrome(), "http://x").expect("redirect"),
            Serialized::Redirect("http://x".to_string())
        );
        assert_eq!(
            (entry.error)(&chrome(), StatusCode::INTERNAL_SERVER_ERROR, "boom").expect("redirect"),
            Serialized::Bare
        );
    }

    #[test]
    fn catalog_lists_every_format() {
        let catalog = catalog();
        assert_eq!(catalog.len(), OutputFormat::ALL.len());
        let json = catalog
            .iter()
            .find(|doc| doc.name == "json")
            .expect("json documented");
        assert_eq!(json.content_type, "application/json");
        assert_eq!(json.success_example, r#"{"new_url":"https://example.com/"}"#);
    }
}
