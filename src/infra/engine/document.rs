//! Navigation hints embedded in HTML documents.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};

/// Targets a document points its reader to, as written in the markup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentHints {
    pub refresh: Option<String>,
    pub canonical: Option<String>,
}

impl DocumentHints {
    /// The hint the walk should follow next. A refresh wins over a canonical link.
    pub fn next(&self) -> Option<&str> {
        self.refresh.as_deref().or(self.canonical.as_deref())
    }
}

/// Scan `html` for `<meta http-equiv="refresh">` and `<link rel="canonical">`.
///
/// Only the first occurrence of each is kept. Malformed markup yields no hints.
pub fn extract_hints(html: &str) -> DocumentHints {
    let hints = Rc::new(RefCell::new(DocumentHints::default()));

    let scanned = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("meta[http-equiv]", {
                    let hints = Rc::clone(&hints);
                    move |el| {
                        let is_refresh = el
                            .get_attribute("http-equiv")
                            .is_some_and(|value| value.trim().eq_ignore_ascii_case("refresh"));
                        if is_refresh
                            && let Some(content) = el.get_attribute("content")
                            && let Some(target) = parse_refresh(&content)
                        {
                            let mut hints = hints.borrow_mut();
                            if hints.refresh.is_none() {
                                hints.refresh = Some(target);
                            }
                        }
                        Ok(())
                    }
                }),
                element!("link[rel][href]", {
                    let hints = Rc::clone(&hints);
                    move |el| {
                        let is_canonical = el.get_attribute("rel").is_some_and(|rel| {
                            rel.split_ascii_whitespace()
                                .any(|token| token.eq_ignore_ascii_case("canonical"))
                        });
                        if is_canonical
                            && let Some(href) = el.get_attribute("href")
                            && !href.trim().is_empty()
                        {
                            let mut hints = hints.borrow_mut();
                            if hints.canonical.is_none() {
                                hints.canonical = Some(href.trim().to_string());
                            }
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    );

    if let Err(err) = scanned {
        tracing::debug!(
            target = "unalix_web::engine::document",
            error = %err,
            "document could not be scanned for hints"
        );
        return DocumentHints::default();
    }

    hints.take()
}

/// Pull the target out of a refresh directive such as `0; url='/next'`.
fn parse_refresh(content: &str) -> Option<String> {
    let (_, rest) = content.split_once([';', ','])?;
    let rest = rest.trim_start();
    let (key, value) = rest.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("url") {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix(['\'', '"'])
        .map(|inner| inner.trim_end_matches(['\'', '"']))
        .unwrap_or(value)
        .trim();

    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_target_is_extracted() {
        let hints = extract_hints(
            r#"<html><head><meta http-equiv="Refresh" content="0; URL='https://example.com/next'"></head></html>"#,
        );
        assert_eq!(hints.refresh.as_deref(), Some("https://example.com/next"));
        assert_eq!(hints.next(), Some("https://example.com/next"));
    }

    #[test]
    fn canonical_link_is_extracted() {
        let hints = extract_hints(
            r#"<head><link rel="stylesheet" href="/a.css"><link rel="canonical" href=" /article "></head>"#,
        );
        assert_eq!(hints.canonical.as_deref(), Some("/article"));
        assert!(hints.refresh.is_none());
    }

    #[test]
    fn refresh_wins_over_canonical() {
        let hints = extract_hints(
            r#"<link rel="canonical" href="/c"><meta http-equiv="refresh" content="3;url=/r">"#,
        );
        assert_eq!(hints.next(), Some("/r"));
    }

    #[test]
    fn refresh_without_url_is_ignored() {
        let hints = extract_hints(r#"<meta http-equiv="refresh" content="30">"#);
        assert_eq!(hints, DocumentHints::default());
    }

    #[test]
    fn refresh_directive_variants() {
        assert_eq!(parse_refresh("0;url=/a").as_deref(), Some("/a"));
        assert_eq!(parse_refresh("5, URL = \"/b\"").as_deref(), Some("/b"));
        assert_eq!(parse_refresh("0; url=").as_deref(), None);
        assert_eq!(parse_refresh("0; next=/c").as_deref(), None);
    }
}
