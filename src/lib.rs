//! Users Directory
//!
//! An account directory with role-based access control:
//! - Account creation, update, revocation, restoration and removal
//! - Owner-or-administrator access policy
//! - Argon2 credential storage and JWT session tokens
//! - In-memory and PostgreSQL stores

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::user::UserRepository;
use infrastructure::{
    auth::{AuthService, JwtConfig, JwtService},
    user::{Argon2Hasher, InMemoryUserRepository, PostgresUserRepository, UserService},
};
use tracing::info;

/// Services shared by every transport
#[derive(Debug)]
pub struct AppState<R: UserRepository> {
    pub users: Arc<UserService<R>>,
    pub auth: Arc<AuthService<R>>,
}

/// Create an empty in-memory store
pub fn create_memory_repository() -> Arc<InMemoryUserRepository> {
    Arc::new(InMemoryUserRepository::new(Arc::new(Argon2Hasher::new())))
}

/// Connect to PostgreSQL and make sure the users table exists
pub async fn create_postgres_repository(
    config: &AppConfig,
) -> anyhow::Result<Arc<PostgresUserRepository>> {
    let database_url = config.storage.database_url()?;

    info!("Connecting to PostgreSQL...");
    let pg_pool = sqlx::PgPool::connect(&database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
    info!("PostgreSQL connection established");

    let repository = PostgresUserRepository::new(pg_pool, Arc::new(Argon2Hasher::new()));
    repository.ensure_schema().await?;

    Ok(Arc::new(repository))
}

/// Create the application state over the given store and seed the
/// configured administrator
pub async fn create_app_state_with_config<R: UserRepository + 'static>(
    repository: Arc<R>,
    config: &AppConfig,
) -> anyhow::Result<AppState<R>> {
    let validation = config.validation.to_policy()?;
    let users = UserService::with_validation(repository.clone(), validation);

    if let Some(password) = &config.bootstrap.admin_password {
        let login = &config.bootstrap.admin_login;
        if users.ensure_bootstrap_admin(login, password).await?.is_some() {
            info!(login = %login, "Seeded initial administrator");
        }
    }

    let jwt = JwtService::new(JwtConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_expiration_hours,
    ));

    Ok(AppState {
        users: Arc::new(users),
        auth: Arc::new(AuthService::new(repository, Arc::new(jwt))),
    })
}
