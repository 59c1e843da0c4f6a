//! User infrastructure module
//!
//! Password hashing with Argon2, the in-memory and PostgreSQL stores, and the
//! user service that puts validation and the access policy in front of them.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::{CreateUserRequest, UpdatePersonalInfoRequest, UserService};
