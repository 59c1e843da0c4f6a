//! Authentication service: credential exchange for session tokens

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::user::{Role, UserRepository};
use crate::domain::DomainError;

use super::jwt::{JwtGenerator, SessionClaims};

/// A freshly issued session token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service
#[derive(Debug)]
pub struct AuthService<R: UserRepository> {
    repository: Arc<R>,
    jwt: Arc<dyn JwtGenerator>,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repository: Arc<R>, jwt: Arc<dyn JwtGenerator>) -> Self {
        Self { repository, jwt }
    }

    /// Exchange a login and password for a signed token.
    ///
    /// An unknown login, a wrong password and a revoked account all produce the
    /// same [`DomainError::Authentication`]. Store failures are passed through.
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<IssuedToken, DomainError> {
        let user = match self
            .repository
            .find_by_login_and_credential(login, password)
            .await
        {
            Ok(user) => user,
            Err(DomainError::NotFound { .. }) => {
                warn!(login = %login, "Authentication failed");
                return Err(DomainError::authentication());
            }
            Err(e) => return Err(e),
        };

        if !user.is_active() {
            warn!(login = %login, "Authentication attempt for revoked account");
            return Err(DomainError::authentication());
        }

        let (token, claims) = self.jwt.generate(user.login(), user.role())?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| DomainError::internal("Token expiry out of range"))?;

        info!(login = %login, role = %claims.role, "Issued session token");

        Ok(IssuedToken {
            token,
            role: claims.role,
            expires_at,
        })
    }

    /// Validate a bearer token and return its claims
    pub fn authorize_token(&self, token: &str) -> Result<SessionClaims, DomainError> {
        self.jwt.validate(token)
    }
}
