//! Tracking-field rules and the `clear` transformation.

use std::{fs, path::Path};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;
use url::{Url, form_urlencoded};

use crate::application::engine::EngineError;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("provider `{provider}` has an invalid pattern `{pattern}`: {source}")]
    Pattern {
        provider: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Declarative form of a provider, shared by the built-in table and rules files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSpec {
    pub name: String,
    pub url_pattern: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub redirections: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    #[serde(default)]
    providers: Vec<ProviderSpec>,
}

#[derive(Debug, Clone)]
struct Provider {
    name: String,
    url_pattern: Regex,
    params: Vec<Regex>,
    redirections: Vec<String>,
    exceptions: Vec<Regex>,
}

impl Provider {
    fn compile(spec: &ProviderSpec) -> Result<Self, RulesError> {
        let compile = |pattern: &str, source: &str| {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|err| RulesError::Pattern {
                    provider: spec.name.clone(),
                    pattern: pattern.to_string(),
                    source: err,
                })
        };

        let url_pattern = compile(&spec.url_pattern, &spec.url_pattern)?;
        let params = spec
            .params
            .iter()
            .map(|param| compile(param, &format!("^(?:{param})$")))
            .collect::<Result<Vec<_>, _>>()?;
        let exceptions = spec
            .exceptions
            .iter()
            .map(|exception| compile(exception, exception))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name.clone(),
            url_pattern,
            params,
            redirections: spec.redirections.clone(),
            exceptions,
        })
    }

    fn applies_to(&self, url: &str) -> bool {
        self.url_pattern.is_match(url) && !self.exceptions.iter().any(|re| re.is_match(url))
    }

    fn strips(&self, name: &str) -> bool {
        self.params.iter().any(|re| re.is_match(name))
    }
}

/// Compiled provider table used by `clear`.
#[derive(Debug, Clone)]
pub struct Rules {
    providers: Vec<Provider>,
}

impl Rules {
    /// Built-in providers followed by those declared in `path`, when given.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        let mut specs = builtin_specs();
        if let Some(path) = path {
            let display = path.display().to_string();
            let source = fs::read_to_string(path).map_err(|source| RulesError::Read {
                path: display.clone(),
                source,
            })?;
            let file: RulesFile = toml::from_str(&source).map_err(|source| RulesError::Parse {
                path: display,
                source,
            })?;
            specs.extend(file.providers);
        }
        Self::compile(&specs)
    }

    pub fn compile(specs: &[ProviderSpec]) -> Result<Self, RulesError> {
        let providers = specs
            .iter()
            .map(Provider::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { providers })
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Strip tracking fields from `raw`.
    ///
    /// Redirection parameters are unwrapped first, at most `max_unwraps` times,
    /// then every parameter claimed by an applicable provider is removed.
    pub fn clear(&self, raw: &str, max_unwraps: usize) -> Result<String, EngineError> {
        let mut current = parse_http_url(raw)?;

        for _ in 0..max_unwraps {
            match self.unwrap_redirection(&current) {
                Some(target) => current = target,
                None => break,
            }
        }

        Ok(self.strip_params(current).into())
    }

    fn unwrap_redirection(&self, url: &Url) -> Option<Url> {
        let query = url.query()?;
        let serialized = url.as_str();

        self.providers
            .iter()
            .filter(|provider| !provider.redirections.is_empty() && provider.applies_to(serialized))
            .find_map(|provider| {
                form_urlencoded::parse(query.as_bytes()).find_map(|(name, value)| {
                    let wanted = provider
                        .redirections
                        .iter()
                        .any(|param| param.eq_ignore_ascii_case(&name));
                    if !wanted {
                        return None;
                    }
                    let target = Url::parse(&value).ok()?;
                    matches!(target.scheme(), "http" | "https").then(|| {
                        tracing::trace!(
                            target = "unalix_web::engine::rules",
                            provider = %provider.name,
                            "unwrapped redirection parameter"
                        );
                        target
                    })
                })
            })
    }

    fn strip_params(&self, mut url: Url) -> Url {
        let Some(query) = url.query().map(str::to_owned) else {
            return url;
        };

        let applicable: Vec<&Provider> = self
            .providers
            .iter()
            .filter(|provider| provider.applies_to(url.as_str()))
            .collect();
        if applicable.is_empty() {
            return url;
        }

        // Keep surviving segments verbatim so their original encoding is preserved.
        let kept: Vec<&str> = query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| {
                let raw_name = segment.split_once('=').map_or(*segment, |(name, _)| name);
                let name = form_urlencoded::parse(raw_name.as_bytes())
                    .next()
                    .map(|(name, _)| name.into_owned())
                    .unwrap_or_default();
                !applicable.iter().any(|provider| provider.strips(&name))
            })
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept.join("&")));
        }
        url
    }
}

fn parse_http_url(raw: &str) -> Result<Url, EngineError> {
    let url = Url::parse(raw).map_err(|err| EngineError::invalid_url(raw, err))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EngineError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

fn spec(name: &str, url_pattern: &str, params: &[&str], redirections: &[&str]) -> ProviderSpec {
    ProviderSpec {
        name: name.to_string(),
        url_pattern: url_pattern.to_string(),
        params: params.iter().map(|param| (*param).to_string()).collect(),
        redirections: redirections.iter().map(|param| (*param).to_string()).collect(),
        exceptions: Vec::new(),
    }
}

fn builtin_specs() -> Vec<ProviderSpec> {
    vec![
        spec(
            "global",
            r".*",
            &[
                r"utm_\w+",
                "fbclid",
                "gclid",
                "dclid",
                "msclkid",
                "mc_eid",
                "mc_cid",
                "igshid",
                "_hsenc",
                "_hsmi",
                "yclid",
                "ref_src",
                "ref_url",
                "spm",
            ],
            &[],
        ),
        spec(
            "google-redirect",
            r"^https?://(?:www\.)?google(?:\.[a-z]{2,3}){1,2}/url\?",
            &[],
            &["q", "url"],
        ),
        spec(
            "google",
            r"^https?://(?:[a-z0-9-]+\.)*google(?:\.[a-z]{2,3}){1,2}/",
            &[
                "ved", "ei", "sa", "usg", "gs_lcp", "gs_lp", "sclient", "oq", "aqs", "sourceid",
                "sxsrf", "uact", "bih", "biw",
            ],
            &[],
        ),
        spec(
            "facebook-redirect",
            r"^https?://l[m]?\.facebook\.com/l\.php",
            &[],
            &["u"],
        ),
        spec(
            "facebook",
            r"^https?://(?:[a-z0-9-]+\.)*facebook\.com/",
            &["h", "__tn__", r"__xts__\[\d+\]", "__cft__\\[\\d+\\]"],
            &[],
        ),
        spec(
            "youtube-redirect",
            r"^https?://(?:www\.)?youtube\.com/redirect",
            &[],
            &["q"],
        ),
        spec(
            "youtube",
            r"^https?://(?:[a-z0-9-]+\.)*(?:youtube\.com|youtu\.be)/",
            &["feature", "kw", "si"],
            &[],
        ),
        spec(
            "amazon",
            r"^https?://(?:[a-z0-9-]+\.)*amazon(?:\.[a-z]{2,3}){1,2}/",
            &[
                "tag",
                "ref_?",
                r"pf_rd_[a-z]+",
                r"pd_rd_[a-z]+",
                "qid",
                "sr",
                "psc",
                "linkCode",
                "linkId",
                "creative",
                "creativeASIN",
                "ascsubtag",
            ],
            &[],
        ),
        spec(
            "twitter",
            r"^https?://(?:[a-z0-9-]+\.)*(?:twitter|x)\.com/",
            &["t", "s"],
            &[],
        ),
    ]
}
