use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use tokio::{net::TcpListener, signal};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;
use unalix_web::{
    application::{
        dispatch::{DispatchOptions, Dispatcher},
        error::AppError,
    },
    config,
    infra::{
        engine::HttpEngine,
        error::InfraError,
        http::{self, ApiQuery, ApiReply, HttpState},
        telemetry,
    },
    presentation::views::LayoutChrome,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;
    let state = build_state(&settings)?;

    match command {
        config::Command::Serve(_) => run_serve(&settings, state).await,
        config::Command::Transform(args) => run_transform(state, args).await,
    }
}

fn build_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let engine = HttpEngine::new(&settings.engine)?;
    let dispatcher = Dispatcher::new(
        Arc::new(engine),
        DispatchOptions::from(&settings.engine),
    );
    Ok(HttpState::new(dispatcher, LayoutChrome::new(&settings.site)))
}

async fn run_serve(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    telemetry::announce_startup(settings);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    telemetry::announce_shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Run one transformation and print what `/api` would have answered.
async fn run_transform(state: HttpState, args: config::TransformArgs) -> Result<(), AppError> {
    let query = ApiQuery {
        method: args.method,
        url: Some(args.url),
        output: Some(args.output),
    };

    let reply = http::answer(&state.dispatcher, &state.chrome, query)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to render response: {err}")))?;

    let response = match reply {
        ApiReply::Docs => return Err(AppError::unexpected("a non-empty URL is required")),
        ApiReply::Rendered { response, .. } => response,
    };

    let mut stdout = io::stdout().lock();
    if let Some(location) = response.location.as_deref() {
        writeln!(stdout, "{location}").map_err(InfraError::from)?;
    } else if !response.body.is_empty() {
        stdout.write_all(&response.body).map_err(InfraError::from)?;
        if !response.body.ends_with(b"\n") {
            writeln!(stdout).map_err(InfraError::from)?;
        }
    }
    stdout.flush().map_err(InfraError::from)?;

    if response.status.is_client_error() || response.status.is_server_error() {
        return Err(AppError::unexpected(format!(
            "transformation failed with status {}",
            response.status
        )));
    }
    Ok(())
}
