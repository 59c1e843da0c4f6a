//! Domain layer - accounts, validation rules and access decisions

pub mod access;
pub mod error;
pub mod user;

pub use access::{AccessPolicy, AccessScope, Requester, RequesterLookup};
pub use error::{DomainError, ErrorKind};
pub use user::{
    Gender, NewUser, Role, User, UserChange, UserId, UserParts, UserProfile, UserRepository,
    UserValidationError, ValidationPolicy,
};
