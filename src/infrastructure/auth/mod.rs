//! Authentication infrastructure module
//!
//! Issues and validates session tokens for authenticated accounts.

mod jwt;
mod service;

pub use jwt::{JwtConfig, JwtGenerator, JwtService, SessionClaims};
pub use service::{AuthService, IssuedToken};
