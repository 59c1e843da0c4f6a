//! User repository trait

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserChange, UserId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository trait for account storage.
///
/// Every call is atomic: it either applies fully or returns an error. Lookups
/// and mutations that match no record return `DomainError::NotFound` carrying
/// the lookup key. Login uniqueness is enforced here, not by callers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Persist a new account, hashing its password. Returns the new ID.
    async fn create(&self, user: NewUser) -> Result<UserId, DomainError>;

    /// Get an account by login
    async fn find_by_login(&self, login: &str) -> Result<User, DomainError>;

    /// Get an account by login whose stored credential matches `password`
    async fn find_by_login_and_credential(
        &self,
        login: &str,
        password: &str,
    ) -> Result<User, DomainError>;

    /// Apply a partial change and stamp modified-at/by
    async fn update_fields(
        &self,
        id: UserId,
        change: UserChange,
        modified_by: &str,
    ) -> Result<UserId, DomainError>;

    /// Mark an account revoked
    async fn soft_delete(&self, id: UserId, revoked_by: &str) -> Result<UserId, DomainError>;

    /// Clear the revocation state
    async fn restore(&self, id: UserId) -> Result<UserId, DomainError>;

    /// Remove the record permanently
    async fn force_delete(&self, id: UserId) -> Result<UserId, DomainError>;

    /// All non-revoked accounts ordered by creation time
    async fn list_active(&self) -> Result<Vec<User>, DomainError>;

    /// Non-revoked accounts with a birthday whose age on `as_of` is at least `age`
    async fn list_older_than(
        &self,
        age: u32,
        as_of: NaiveDate,
    ) -> Result<Vec<User>, DomainError>;
}
