//! Test utilities for integration testing
use crate::auth::current_user::CurrentUser;
use crate::auth::session::create_session_token;
use crate::config::{Config, PoolSettings};
use crate::storage::LocalImageStorage;
use crate::{AppState, Application};
use axum_test::TestServer;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tempfile::TempDir;

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        database: crate::config::DatabaseConfig {
            url: "postgres://localhost:5432/catalog_test".to_string(), // Overridden by the sqlx::test pool
            pool: PoolSettings {
                max_connections: 4,
                min_connections: 0,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

pub fn test_user() -> CurrentUser {
    CurrentUser {
        id: uuid::Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001),
        email: "editor@example.com".to_string(),
    }
}

/// `Authorization` header value for `user`, signed with the test config's key
pub fn bearer_for(user: &CurrentUser) -> String {
    let token = create_session_token(user, &create_test_config()).expect("Failed to create session token");
    format!("Bearer {token}")
}

/// State for extractor tests that never touch the database
pub fn create_test_state() -> AppState {
    let config = create_test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("Failed to create lazy pool");

    AppState::builder()
        .db(pool)
        .storage(Arc::new(LocalImageStorage::new(std::env::temp_dir().join("catalog-test-uploads"), "/uploads")))
        .config(config)
        .build()
}

pub async fn create_test_app(pool: PgPool) -> (TestServer, TempDir) {
    create_test_app_with_config(pool, create_test_config()).await
}

/// Test server over `pool`, with uploads written to a fresh temporary directory
pub async fn create_test_app_with_config(pool: PgPool, mut config: Config) -> (TestServer, TempDir) {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    config.uploads.dir = uploads.path().to_path_buf();

    let app = Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    (app.into_test_server(), uploads)
}
