//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, EngineOverrides, ServeArgs, ServeOverrides, TransformArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "unalix";
const ENV_PREFIX: &str = "UNALIX";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DEADLINE_SECS: u64 = 30;
const DEFAULT_MAX_REDIRECTS: u64 = 13;
const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 1024 * 1024;
const DEFAULT_SITE_TITLE: &str = "Unalix-web";
const DEFAULT_SITE_DESCRIPTION: &str = "Remove tracking fields and resolve shortened URLs.";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub engine: EngineSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub http_timeout: Duration,
    pub deadline: Duration,
    pub max_redirects: NonZeroUsize,
    pub follow_documents: bool,
    pub max_document_bytes: NonZeroU64,
    pub user_agent: String,
    pub rules_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Transform(args)) => raw.apply_engine_overrides(&args.engine),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    engine: RawEngineSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_engine_overrides(&overrides.engine);
    }

    fn apply_engine_overrides(&mut self, overrides: &EngineOverrides) {
        if let Some(seconds) = overrides.http_timeout_seconds {
            self.engine.http_timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.deadline_seconds {
            self.engine.deadline_seconds = Some(seconds);
        }
        if let Some(max) = overrides.max_redirects {
            self.engine.max_redirects = Some(max);
        }
        if let Some(follow) = overrides.follow_documents {
            self.engine.follow_documents = Some(follow);
        }
        if let Some(agent) = overrides.user_agent.as_ref() {
            self.engine.user_agent = Some(agent.clone());
        }
        if let Some(path) = overrides.rules_file.as_ref() {
            self.engine.rules_file = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            engine,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let engine = build_engine_settings(engine)?;
        let site = build_site_settings(site);

        Ok(Self {
            server,
            logging,
            engine,
            site,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_engine_settings(engine: RawEngineSettings) -> Result<EngineSettings, LoadError> {
    let http_timeout = non_zero_seconds(
        engine
            .http_timeout_seconds
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        "engine.http_timeout_seconds",
    )?;
    let deadline = non_zero_seconds(
        engine.deadline_seconds.unwrap_or(DEFAULT_DEADLINE_SECS),
        "engine.deadline_seconds",
    )?;
    if deadline < http_timeout {
        return Err(LoadError::invalid(
            "engine.deadline_seconds",
            "must not be shorter than engine.http_timeout_seconds",
        ));
    }

    let max_redirects_value = engine.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);
    let max_redirects = usize::try_from(max_redirects_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "engine.max_redirects",
                "must be greater than zero and fit in usize",
            )
        })?;

    let max_document_bytes = NonZeroU64::new(
        engine
            .max_document_bytes
            .unwrap_or(DEFAULT_MAX_DOCUMENT_BYTES),
    )
    .ok_or_else(|| LoadError::invalid("engine.max_document_bytes", "must be greater than zero"))?;

    let user_agent = match engine.user_agent {
        Some(agent) if agent.trim().is_empty() => {
            return Err(LoadError::invalid(
                "engine.user_agent",
                "must not be empty",
            ));
        }
        Some(agent) => agent,
        None => default_user_agent().to_string(),
    };

    let rules_file = engine
        .rules_file
        .filter(|path| !path.as_os_str().is_empty());

    Ok(EngineSettings {
        http_timeout,
        deadline,
        max_redirects,
        follow_documents: engine.follow_documents.unwrap_or(true),
        max_document_bytes,
        user_agent,
        rules_file,
    })
}

fn build_site_settings(site: RawSiteSettings) -> SiteSettings {
    let title = site
        .title
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());
    let description = site
        .description
        .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string());

    SiteSettings { title, description }
}

pub fn default_user_agent() -> &'static str {
    concat!("unalix-web/", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEngineSettings {
    http_timeout_seconds: Option<u64>,
    deadline_seconds: Option<u64>,
    max_redirects: Option<u64>,
    follow_documents: Option<bool>,
    max_document_bytes: Option<u64>,
    user_agent: Option<String>,
    rules_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    description: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}
