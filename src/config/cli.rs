use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the unalix-web binary.
#[derive(Debug, Parser)]
#[command(
    name = "unalix-web",
    version,
    about = "Remove tracking fields and resolve shortened URLs over HTTP"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "UNALIX_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Transform a single URL and print the rendered body.
    Transform(TransformArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct EngineOverrides {
    /// Override the per-request HTTP timeout used while following redirects.
    #[arg(long = "engine-http-timeout-seconds", value_name = "SECONDS")]
    pub http_timeout_seconds: Option<u64>,

    /// Override the overall deadline for one transformation.
    #[arg(long = "engine-deadline-seconds", value_name = "SECONDS")]
    pub deadline_seconds: Option<u64>,

    /// Override the maximum number of redirects followed by `unshort`.
    #[arg(long = "engine-max-redirects", value_name = "COUNT")]
    pub max_redirects: Option<u64>,

    /// Toggle inspection of HTML documents for refresh and canonical hints.
    #[arg(
        long = "engine-follow-documents",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub follow_documents: Option<bool>,

    /// Override the User-Agent sent while following redirects.
    #[arg(long = "engine-user-agent", value_name = "AGENT")]
    pub user_agent: Option<String>,

    /// Extra tracking rules merged with the built-in set.
    #[arg(long = "engine-rules-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub rules_file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub engine: EngineOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct TransformArgs {
    #[command(flatten)]
    pub engine: EngineOverrides,

    /// Operation to run (unshort|clear); defaults to unshort.
    #[arg(long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Output format (html|json|jsonp|xml|yaml|toml|text|redirect); defaults to text.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// URL to transform; a missing scheme is treated as http.
    #[arg(value_name = "URL", value_hint = ValueHint::Url)]
    pub url: String,
}
