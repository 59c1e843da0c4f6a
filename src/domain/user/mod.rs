//! User domain
//!
//! This module provides domain types and traits for the account directory,
//! including the immutable account entity, validation rules, and the store trait.

mod entity;
mod repository;
mod validation;

pub use entity::{
    age_on, Gender, NewUser, Role, User, UserChange, UserId, UserParts, UserProfile,
};
pub use repository::UserRepository;
pub use validation::{
    validate_gender, UserValidationError, ValidationPolicy, CYRILLIC_NAME_PATTERN, STRICT_PATTERN,
};

#[cfg(test)]
pub use repository::MockUserRepository;
