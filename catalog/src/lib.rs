//! # catalog: Listing ingestion for a heterogeneous marketplace
//!
//! `catalog` stores listings of vehicles, agricultural machinery and tools.
//! Each listing carries a price, a category-specific `specs` map and an
//! ordered set of images whose first entry is the cover.
//!
//! ## What It Does
//!
//! Listings reach the service in one of two shapes: a structured edit form, or
//! a single block of free text that the [`domain::parser`] turns into a draft.
//! Either way the specs are checked against their category by
//! [`domain::specs`] before anything is written, and the publication row and
//! its image rows are written in one transaction.
//!
//! Images are uploaded separately, as one batch per submit. The editor-side
//! flow in [`client`] uploads the files the user picked, binds the returned
//! paths back to the slots they were picked into, and sends the final ordered
//! list with the create or update call. See [`domain::images`].
//!
//! ## Architecture
//!
//! - [`api`]: Axum handlers and wire models
//! - [`auth`]: Session token verification and the [`auth::current_user::CurrentUser`] extractor
//! - [`db`]: Repositories over PostgreSQL
//! - [`domain`]: Validation, parsing and image reconciliation, free of I/O
//! - [`storage`]: Where uploaded files are written
//! - [`client`]: Typed HTTP client and the editor submit flow
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::storage::{ImageStorage, LocalImageStorage};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Json, Router, http,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .storage(Arc::new(LocalImageStorage::new("./uploads", "/uploads")))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub storage: Arc<dyn ImageStorage>,
}

/// Install the process-wide rustls crypto provider used by `reqwest` and `sqlx`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Get the catalog database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

async fn connect_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool_settings = &config.database.pool;

    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(pool_settings.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// Everything lives under `/api`; the OpenAPI document is served at
/// `/api/openapi.json` and rendered at `/api/docs`.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/health", get(api::handlers::health::health))
        .route(
            "/publications",
            get(api::handlers::publications::list_publications).post(api::handlers::publications::create_publication),
        )
        .route(
            "/publications/{id}",
            get(api::handlers::publications::get_publication)
                .put(api::handlers::publications::update_publication)
                .delete(api::handlers::publications::delete_publication),
        )
        .route(
            "/upload",
            post(api::handlers::uploads::upload_images).layer(DefaultBodyLimit::max(state.config.upload_body_limit())),
        )
        .route("/bot/parse", post(api::handlers::bot::parse_listing))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new().nest("/api", api_routes).layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The running service: database pool, state and router.
///
/// 1. **Create**: [`Application::new`] connects to the database and runs migrations
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown future resolves, in-flight requests finish and the pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], reusing an existing pool when one is given
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting catalog with configuration: {:#?}", config);
        install_crypto_provider();

        let pool = match pool {
            Some(pool) => pool,
            None => connect_database(&config).await?,
        };
        migrator().run(&pool).await?;

        let storage = LocalImageStorage::new(config.uploads.dir.clone(), config.uploads.public_prefix.clone());
        tokio::fs::create_dir_all(storage.base_dir()).await?;

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .storage(Arc::new(storage))
            .build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Catalog listening on http://{}, docs at http://localhost:{}/api/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
