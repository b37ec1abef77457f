use crate::cache::CacheList;
use crate::config::Config;
use crate::renderer::RendererClient;
use crate::search_api::SearchApiClient;
use crate::state::AppState;
use crate::topic_api::{TopicApi, TopicApiClient};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the main loop stopped.
enum Stop {
    Signal,
    ServerExited(Result<std::io::Result<()>, JoinError>),
}

/// Main application struct containing all necessary components
pub struct App {
    config: Arc<Config>,
    state: AppState,
}

impl App {
    /// Build upstream clients and caches. No network I/O happens here.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let topic_api: Arc<dyn TopicApi> = Arc::new(
            TopicApiClient::new(
                &config.api_router_url,
                config.is_publishing,
                config.topic_api_timeout,
            )
            .context("Failed to create topic API client")?,
        );
        let search_api = Arc::new(
            SearchApiClient::new(&config.api_router_url, config.topic_api_timeout)
                .context("Failed to create search API client")?,
        );
        let renderer = Arc::new(
            RendererClient::new(&config.renderer_url, config.topic_api_timeout)
                .context("Failed to create renderer client")?,
        );

        let caches = CacheList::new(&config, topic_api).context("Failed to create caches")?;
        info!(
            publishing = config.is_publishing,
            census_filter = config.enable_census_topic_filter_option,
            navigation = config.enable_new_navbar,
            update_interval = ?config.cache_update_interval,
            "caches configured"
        );

        let state = AppState::new(config.clone(), search_api, renderer, caches);
        Ok(App { config, state })
    }

    /// Populate every cache, then start periodic updates and the web server
    /// and wait for a shutdown signal.
    ///
    /// No request is served before the first refresh pass has finished; a
    /// failure in that pass exits without binding the port.
    pub async fn run(self) -> ExitCode {
        let start = Instant::now();
        let populated = tokio::select! {
            result = self.state.caches.initial_refresh() => result,
            _ = shutdown_signal() => {
                info!("shutdown signal received while populating caches");
                self.state.caches.close();
                return ExitCode::SUCCESS;
            }
        };
        if let Err(e) = populated {
            error!(error = %e, source = ?std::error::Error::source(&e), "cache failed to populate, shutting down");
            self.state.caches.close();
            return ExitCode::FAILURE;
        }
        info!(elapsed = fmt_duration(start.elapsed()), "caches populated");

        let cancel = CancellationToken::new();
        let cache_tasks = self.state.caches.spawn_updates(&cancel);

        let listener = match TcpListener::bind(("0.0.0.0", self.config.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port = self.config.port, error = %e, "Failed to bind web server");
                cancel.cancel();
                self.state.caches.close();
                return ExitCode::FAILURE;
            }
        };
        info!(port = self.config.port, "web server listening");

        let server_shutdown = CancellationToken::new();
        let mut server = tokio::spawn({
            let router = create_router(self.state.clone());
            let token = server_shutdown.clone();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(token.cancelled_owned())
                    .await
            }
        });

        let stop = tokio::select! {
            _ = shutdown_signal() => Stop::Signal,
            result = &mut server => Stop::ServerExited(result),
        };

        let mut exit = ExitCode::SUCCESS;
        let server = match stop {
            Stop::Signal => {
                info!("shutdown signal received");
                Some(server)
            }
            Stop::ServerExited(result) => {
                match result {
                    Ok(Ok(())) => warn!("web server exited unexpectedly"),
                    Ok(Err(e)) => error!(error = %e, "web server failed"),
                    Err(e) => error!(error = ?e, "web server task panicked"),
                }
                exit = ExitCode::FAILURE;
                None
            }
        };

        server_shutdown.cancel();
        cancel.cancel();
        self.state.caches.close();

        let timeout = self.config.shutdown_timeout;
        let drain = async {
            if let Some(server) = server {
                match server.await {
                    Ok(Ok(())) => info!("web server stopped"),
                    Ok(Err(e)) => warn!(error = %e, "web server stopped with error"),
                    Err(e) => warn!(error = ?e, "web server task failed"),
                }
            }
            futures::future::join_all(cache_tasks).await;
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out");
            exit = ExitCode::FAILURE;
        }

        info!("shutdown complete");
        exit
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
