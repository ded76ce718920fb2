//! Shared fixtures for tests that need a configured app, state or registered user.

use crate::{
    AppState,
    auth::password::{self, PasswordScheme},
    config::{Config, PoolSettings},
    db::{
        handlers::{AuthMethods, Repository, UserAuthMethods, Users},
        models::{
            auth_methods::{PASSWORD_METHOD, PasswordProviderData, UserAuthMethodCreateDBRequest},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
};
use axum_test::TestServer;
use sqlx::PgPool;

/// Default configuration with Argon2 costs turned down so tests stay fast
pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config
}

pub fn create_test_app_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

/// Full application, route gate included, on the given pool
pub async fn create_test_app(pool: PgPool) -> TestServer {
    crate::Application::new_with_pool(create_test_config(), Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Insert a registered user with a primary password binding
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str) -> UserDBResponse {
    let config = create_test_config();
    let password_hash =
        password::hash_password(password, PasswordScheme::Argon2, config.auth.password.argon2_params()).expect("Failed to hash password");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let method = AuthMethods::new(&mut tx)
        .get_active_by_name(PASSWORD_METHOD)
        .await
        .expect("Failed to look up password method")
        .expect("password method is seeded");
    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest::registered(email.to_string(), None, None))
        .await
        .expect("Failed to create test user");
    UserAuthMethods::new(&mut tx)
        .create(&UserAuthMethodCreateDBRequest {
            user_id: user.id,
            auth_method_id: method.id,
            provider_id: email.to_string(),
            provider_data: PasswordProviderData { password_hash }.to_value(),
            is_primary: true,
        })
        .await
        .expect("Failed to bind password");
    tx.commit().await.expect("Failed to commit test user");

    user
}
