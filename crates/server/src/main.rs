//! Catalog proxy - cached WooCommerce catalog and query engine.
//!
//! This binary serves the catalog API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON only
//! - WooCommerce REST API (`wc/v3`) as the single upstream
//! - In-memory snapshot and query cache (`moka`), refreshed every 5 minutes
//!
//! # Startup
//!
//! The first snapshot is built before the listener opens. If upstream is
//! unreachable the server still starts, `/health/ready` answers 503 and the
//! first query or scheduled refresh retries the load.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use catalog_proxy_server::catalog::{Catalog, SystemClock, spawn_refresh_task};
use catalog_proxy_server::config::ServerConfig;
use catalog_proxy_server::state::AppState;
use catalog_proxy_server::woocommerce::WooClient;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_proxy_server=info,catalog_proxy=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    tracing::info!(
        store = %config.woocommerce.base_url,
        ttl_secs = config.cache.ttl.as_secs(),
        refresh_secs = config.cache.refresh_interval.as_secs(),
        "Configuration loaded"
    );

    let source = WooClient::new(&config.woocommerce)?;
    let catalog = Catalog::new(Arc::new(source), &config.cache, Arc::new(SystemClock));

    if let Err(e) = catalog.force_resync().await {
        tracing::error!(error = %e, "Initial snapshot load failed; serving will retry on demand");
    }

    let _refresh = spawn_refresh_task(catalog.clone(), config.cache.refresh_interval);

    let app = catalog_proxy_server::router(AppState::new(catalog))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("catalog proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
