//! Scheme qualification for user-supplied URLs.

use std::fmt;

const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";

/// A URL string that is guaranteed to start with `http://` or `https://`.
///
/// Only [`normalize`] constructs it, so downstream code never re-derives the scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix `http://` unless the input already carries an http(s) scheme.
///
/// Malformed URLs pass through; rejecting them is the engine's concern.
pub fn normalize(raw: &str) -> NormalizedUrl {
    if raw.starts_with(HTTP_PREFIX) || raw.starts_with(HTTPS_PREFIX) {
        NormalizedUrl(raw.to_string())
    } else {
        NormalizedUrl(format!("{HTTP_PREFIX}{raw}"))
    }
}
