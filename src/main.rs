use std::{process, sync::Arc};

use shareabouts::{
    application::{activity::ActivityService, error::AppError, resources::ResourceService},
    cache::{CacheConfig, CachingDispatcher, FamilyTable, ResponseCache},
    config::{self, Settings},
    infra::{
        db::MemoryRepositories,
        error::InfraError,
        http::{self, ApiState, ProxyState},
        telemetry,
    },
};
use tokio::{net::TcpListener, sync::watch};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let repositories = Arc::new(MemoryRepositories::new());
    let resources = ResourceService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );
    let activity = ActivityService::new(repositories);
    let state = ApiState {
        resources: Arc::new(resources),
        activity: Arc::new(activity),
    };

    let cache_config = CacheConfig::from(&settings.cache);
    let dispatcher = Arc::new(CachingDispatcher::new(
        ResponseCache::in_memory(&cache_config),
        cache_config.clone(),
        FamilyTable::shareabouts(),
    ));

    let proxy = ProxyState::from_settings(&settings.proxy).map_err(|err| {
        InfraError::configuration(format!("failed to build proxy client: {err}"))
    })?;

    info!(
        cache_enabled = cache_config.enabled,
        response_limit = cache_config.response_limit,
        proxy_enabled = settings.proxy.is_enabled(),
        "starting shareabouts"
    );

    let router = http::build_router(state, dispatcher, proxy);
    serve_http(&settings, router).await
}

async fn serve_http(settings: &Settings, router: axum::Router) -> Result<(), AppError> {
    let addr = settings.server.addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;
    info!(addr = %addr, "listening");

    let (signal_tx, mut signal_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signal_tx.send(true);
        },
    );

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        if signal_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!("server stopped");
        }
        () = deadline => {
            warn!(
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; closing open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
