//! Session token generation and validation

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

use crate::domain::user::Role;
use crate::domain::DomainError;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account login)
    pub sub: String,
    /// "Admin" or "User"
    pub role: Role,
    pub iss: String,
    pub aud: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl SessionClaims {
    /// Create new claims for an account.
    ///
    /// Fails when the configured lifetime does not fit a timestamp.
    pub fn new(login: &str, role: Role, config: &JwtConfig) -> Result<Self, DomainError> {
        let now = Utc::now();
        let exp = i64::try_from(config.expiration_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                DomainError::internal(format!(
                    "Token lifetime of {} hours is out of range",
                    config.expiration_hours
                ))
            })?;

        Ok(Self {
            sub: login.to_string(),
            role,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    pub fn login(&self) -> &str {
        &self.sub
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Configuration for JWT service
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Token expiration time in hours
    pub expiration_hours: u64,
}

impl JwtConfig {
    /// Create new JWT configuration
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiration_hours: u64,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            expiration_hours,
        }
    }
}

/// Trait for session token operations
pub trait JwtGenerator: Send + Sync + Debug {
    /// Issue a signed token for an account
    fn generate(&self, login: &str, role: Role) -> Result<(String, SessionClaims), DomainError>;

    /// Validate a token and return its claims
    fn validate(&self, token: &str) -> Result<SessionClaims, DomainError>;

    /// Get the token expiration time in hours
    fn expiration_hours(&self) -> u64;
}

/// HS256 JWT service using a shared secret
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("expiration_hours", &self.config.expiration_hours)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

impl JwtGenerator for JwtService {
    fn generate(&self, login: &str, role: Role) -> Result<(String, SessionClaims), DomainError> {
        if self.config.secret.is_empty() {
            return Err(DomainError::internal("JWT signing secret is not configured"));
        }

        let claims = SessionClaims::new(login, role, &self.config)?;

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to generate JWT: {}", e)))?;

        Ok((token, claims))
    }

    fn validate(&self, token: &str) -> Result<SessionClaims, DomainError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| {
                debug!(error = %e, "Rejected session token");
                DomainError::authentication()
            })?;

        Ok(token_data.claims)
    }

    fn expiration_hours(&self) -> u64 {
        self.config.expiration_hours
    }
}
