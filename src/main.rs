//! Learning Hub Backend
//!
//! A production-grade REST backend with SQLite persistence and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod policy;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Learning Hub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (HUB_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let hits = repo.all_search_hits().await?;
    search.rebuild(&hits).await?;
    tracing::info!("Search index built with {} documents", hits.len());

    // Create application state
    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Postcards
        .route("/postcards", get(api::list_postcards))
        .route("/postcards", post(api::create_postcard))
        .route("/postcards/{id}", get(api::get_postcard))
        .route("/postcards/{id}", put(api::update_postcard))
        .route("/postcards/{id}", delete(api::delete_postcard))
        // 3-2-1 reflections
        .route("/three-two-one", get(api::list_three_two_ones))
        .route("/three-two-one", post(api::create_three_two_one))
        .route("/three-two-one/{id}", get(api::get_three_two_one))
        .route("/three-two-one/{id}", put(api::update_three_two_one))
        .route("/three-two-one/{id}", delete(api::delete_three_two_one))
        // Takeovers
        .route("/takeovers", get(api::list_takeovers))
        .route("/takeovers", post(api::create_takeover))
        .route("/takeovers/{id}", get(api::get_takeover))
        .route("/takeovers/{id}", put(api::update_takeover))
        .route("/takeovers/{id}", delete(api::delete_takeover))
        // Themes
        .route("/themes", get(api::list_themes))
        .route("/themes", post(api::create_theme))
        // Teams
        .route("/teams", get(api::list_teams))
        .route("/teams", post(api::create_team))
        // Profiles
        .route("/profiles", get(api::list_profiles))
        .route("/profiles", post(api::create_profile))
        .route("/profiles/{id}", get(api::get_profile))
        .route("/profiles/{id}", put(api::update_profile))
        // Search
        .route("/search", get(api::global_search))
        // Auth helpers
        .route("/auth/validate-email", post(api::validate_email))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
