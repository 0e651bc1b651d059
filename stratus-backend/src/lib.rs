use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export shared types from stratus-types
pub use stratus_types::*;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod quota;
pub mod storage;

use cache::{ListingCache, MemoryCache};
use config::Config;
use database::{setup_database, user_ops};
use error::{AppError, Result};
use quota::UploadLocks;
use storage::FileStorage;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub storage: FileStorage,
    pub cache: ListingCache,
    pub upload_locks: UploadLocks,
}

pub async fn run_server() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Setup database
    let db = setup_database(&config.database_url).await?;

    // Setup file storage
    let storage = FileStorage::new(&config.storage_dir);
    storage.init().await?;

    // Make sure an elevated account exists on a fresh install
    user_ops::ensure_admin(&db, &config).await?;

    // Setup the listing cache
    let cache = ListingCache::new(
        Arc::new(MemoryCache::new()),
        Duration::from_secs(config.cache_ttl_secs),
    );

    // Extract config values before moving state
    let server_address = config.server_address.clone();
    let storage_dir = config.storage_dir.clone();

    // Create application state
    let state = AppState {
        db,
        config,
        storage,
        cache,
        upload_locks: UploadLocks::new(),
    };

    // Build the application router
    let app = create_app(state);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&server_address)
        .await
        .map_err(|e| {
            AppError::ServerError(format!("Failed to bind to {}: {}", server_address, e))
        })?;

    tracing::info!("🚀 Stratus backend server starting on {}", server_address);
    tracing::info!("📁 File storage directory: {}", storage_dir);

    // Start the server
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::ServerError(format!("Server error: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    // Uploads carry multipart framing on top of the payload
    let upload_limit = state.config.max_upload_size + 1024 * 1024;

    Router::new()
        // File records
        .route(
            "/api/files",
            get(handlers::list_files)
                .post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/files/:id",
            get(handlers::get_file)
                .patch(handlers::update_file)
                .delete(handlers::delete_file),
        )
        // Downloads
        .route("/api/files/:id/download", get(handlers::download_file))
        .route("/api/shared/:token", get(handlers::shared_download))
        // Share links
        .route(
            "/api/files/:id/share",
            patch(handlers::share_file).delete(handlers::unshare_file),
        )
        // Accounts
        .route("/api/storage/usage", get(handlers::storage_usage))
        .route("/api/users/me", get(handlers::current_user))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/users/:id", delete(handlers::delete_user))
        // Cleanup operations
        .route(
            "/api/admin/cleanup/shares",
            post(handlers::cleanup_expired_shares),
        )
        // Health check
        .route("/health", get(handlers::health_check))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
