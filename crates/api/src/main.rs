use std::net::SocketAddr;
use std::sync::Arc;

use storyplan_api::background::editor_sweep::start_editor_sweep;
use storyplan_api::config::{ServerConfig, StorageBackend};
use storyplan_api::router::build_app_router;
use storyplan_api::state::AppState;
use storyplan_db::store::{LocalStore, PgStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyplan_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        admins = config.admin_emails.len(),
        "Loaded server configuration"
    );

    // --- Storage ---
    let store = open_store(&config.storage).await;
    store
        .health_check()
        .await
        .expect("Storage health check failed");
    tracing::info!(backend = store.backend_name(), "Storage ready");

    // --- Router ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState::new(store, config.clone());
    let editors = Arc::clone(&state.editors);
    let app = build_app_router(state, &config);

    // --- Background tasks ---
    let sweep_handle = start_editor_sweep(Arc::clone(&editors));

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    sweep_handle.abort();
    let open_editors = editors.len().await;
    if open_editors > 0 {
        tracing::warn!(open_editors, "Discarding unsaved editor sessions");
    }
    tracing::info!("Graceful shutdown complete");
}

/// Connect to the configured storage backend.
///
/// Postgres gets a pool and pending migrations; the local backend loads (or
/// starts) its JSON document.
async fn open_store(backend: &StorageBackend) -> Arc<dyn Store> {
    match backend {
        StorageBackend::Postgres { database_url } => {
            let pool = storyplan_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            storyplan_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Local { path } => {
            let store = LocalStore::open(path.clone())
                .await
                .expect("Failed to open local store");
            Arc::new(store)
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
