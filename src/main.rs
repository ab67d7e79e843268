//! # Passkey Gate
//!
//! Entry point for a passwordless authentication demo server. A user
//! registers a hardware-backed public key against a username and later
//! proves possession of the matching private key to establish a session;
//! no shared secret ever traverses the wire.
//!
//! The protocol core (challenge issuance, binding, consumption, ceremony
//! verification, counter-based replay protection) lives in the library
//! crate; this binary wires it to HTTP, sessions and storage.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore as SessionMemoryStore, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore as SessionSqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passkey_gate::config::Config;
use passkey_gate::handlers::admin::{get_mode, set_mode};
use passkey_gate::handlers::auth::{
    authenticate_finish, authenticate_start, logout, register_finish, register_start,
    session_info,
};
use passkey_gate::handlers::health::health_check;
use passkey_gate::handlers::users::{get_current_user, list_users};
use passkey_gate::middleware;
use passkey_gate::state::AppState;
use passkey_gate::store::{MemoryStore, SqliteStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, filterable via RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    // Storage backend: SQLite when DATABASE_URL is set, otherwise process
    // memory. The session store reuses the SQLite pool when available.
    let (store, session_pool): (Arc<dyn Store>, Option<sqlx::SqlitePool>) =
        match &config.database_url {
            Some(url) => {
                tracing::info!("Using SQLite storage");
                let store = SqliteStore::connect(url).await?;
                let pool = store.pool().clone();
                (Arc::new(store), Some(pool))
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set; users and credentials are lost on restart"
                );
                (Arc::new(MemoryStore::new()), None)
            }
        };

    let app_state = AppState::new(&config, store);
    tracing::info!("Application state initialized");

    // Challenges are single-use, but an abandoned ceremony leaves one
    // orphaned entry; prune aged-out entries periodically
    let cleanup_store = app_state.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            match cleanup_store.expire_challenges().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Pruned {} expired challenges", n),
                Err(e) => tracing::error!("Challenge cleanup failed: {:?}", e),
            }
        }
    });

    // In production, restrict CORS to specific origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes requiring an authenticated session
    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .layer(axum_middleware::from_fn(middleware::auth::require_auth));

    let app = Router::new()
        .route("/health", get(health_check))
        // Registration ceremony
        .route("/api/auth/register/start", post(register_start))
        .route("/api/auth/register/finish", post(register_finish))
        // Authentication ceremony
        .route("/api/auth/authenticate/start", post(authenticate_start))
        .route("/api/auth/authenticate/finish", post(authenticate_finish))
        // Session management
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session_info))
        // Demo user listing and user-verification mode control
        .route("/api/users", get(list_users))
        .route("/api/admin/mode", get(get_mode).post(set_mode))
        .merge(protected_routes)
        // Frontend assets
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Session layer goes on last so every route sees it; 24 hours of
    // inactivity ends the session
    let app = match session_pool {
        Some(pool) => {
            let session_store = SessionSqliteStore::new(pool);
            session_store.migrate().await?;
            app.layer(
                SessionManagerLayer::new(session_store)
                    .with_expiry(Expiry::OnInactivity(Duration::hours(24))),
            )
        }
        None => app.layer(
            SessionManagerLayer::new(SessionMemoryStore::default())
                .with_expiry(Expiry::OnInactivity(Duration::hours(24))),
        ),
    };

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
