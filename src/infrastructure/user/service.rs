//! User service for account management

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::domain::access::{AccessPolicy, AccessScope, StoreLookup};
use crate::domain::user::{
    validate_gender, Gender, NewUser, User, UserChange, UserId, UserProfile, UserRepository,
    UserValidationError, ValidationPolicy,
};
use crate::domain::DomainError;

/// Request for creating a new account
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub login: String,
    pub password: String,
    pub name: String,
    pub gender: i32,
    pub birthday: Option<NaiveDate>,
    pub admin: bool,
}

/// Request for replacing an account's personal information
#[derive(Debug, Clone)]
pub struct UpdatePersonalInfoRequest {
    pub name: String,
    pub gender: i32,
    pub birthday: Option<NaiveDate>,
}

fn invalid(e: UserValidationError) -> DomainError {
    DomainError::validation(e.to_string())
}

/// User service: validates input, resolves targets, applies the access policy
/// and delegates to the store
#[derive(Debug)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    policy: AccessPolicy,
    validation: ValidationPolicy,
}

impl<R: UserRepository + 'static> UserService<R> {
    /// Create a new user service with the strict validation policy
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_validation(repository, ValidationPolicy::default())
    }

    /// Create a new user service with a custom validation policy
    pub fn with_validation(repository: Arc<R>, validation: ValidationPolicy) -> Self {
        let policy = AccessPolicy::new(Arc::new(StoreLookup::new(repository.clone())));

        Self {
            repository,
            policy,
            validation,
        }
    }

    /// Replace the access policy
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a new account. Administrators only.
    pub async fn create_user(
        &self,
        request: CreateUserRequest,
        created_by: &str,
    ) -> Result<UserId, DomainError> {
        self.policy.require_admin(created_by, &request.login).await?;
        self.create_unchecked(request, created_by).await
    }

    /// Seed an administrator account when none with that login exists.
    ///
    /// Returns the new ID, or `None` when the login is already present.
    pub async fn ensure_bootstrap_admin(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<UserId>, DomainError> {
        if self.login_taken(login).await? {
            debug!(login = %login, "Bootstrap administrator already exists");
            return Ok(None);
        }

        let request = CreateUserRequest {
            login: login.to_string(),
            password: password.to_string(),
            name: login.to_string(),
            gender: Gender::Unspecified.code(),
            birthday: None,
            admin: true,
        };

        self.create_unchecked(request, login).await.map(Some)
    }

    async fn create_unchecked(
        &self,
        request: CreateUserRequest,
        created_by: &str,
    ) -> Result<UserId, DomainError> {
        self.validation.validate_login(&request.login).map_err(invalid)?;
        self.validation.validate_password(&request.password).map_err(invalid)?;
        self.validation.validate_name(&request.name).map_err(invalid)?;
        let gender = validate_gender(request.gender).map_err(invalid)?;

        // The store's unique constraint is authoritative; this only fails early
        if self.login_taken(&request.login).await? {
            return Err(DomainError::conflict(format!(
                "User with login {} already exists",
                request.login
            )));
        }

        info!(login = %request.login, admin = request.admin, created_by = %created_by, "Creating user");

        self.repository
            .create(NewUser {
                login: request.login,
                password: request.password,
                name: request.name,
                gender,
                birthday: request.birthday,
                admin: request.admin,
                created_by: created_by.to_string(),
            })
            .await
    }

    /// Replace name, gender and birthday. Owner or administrator.
    pub async fn update_personal_info(
        &self,
        login: &str,
        request: UpdatePersonalInfoRequest,
        modified_by: &str,
    ) -> Result<UserId, DomainError> {
        let target = self.resolve_with_access(login, modified_by).await?;

        self.validation.validate_name(&request.name).map_err(invalid)?;
        let gender = validate_gender(request.gender).map_err(invalid)?;

        info!(login = %login, modified_by = %modified_by, "Updating personal info");

        self.repository
            .update_fields(
                target.id(),
                UserChange::PersonalInfo {
                    name: request.name,
                    gender,
                    birthday: request.birthday,
                },
                modified_by,
            )
            .await
    }

    /// Rename an account. Owner or administrator.
    pub async fn update_login(
        &self,
        login: &str,
        new_login: &str,
        modified_by: &str,
    ) -> Result<UserId, DomainError> {
        let target = self.resolve_with_access(login, modified_by).await?;

        self.validation.validate_login(new_login).map_err(invalid)?;

        if new_login == target.login() {
            return Ok(target.id());
        }

        if self.login_taken(new_login).await? {
            return Err(DomainError::conflict(format!(
                "User with login {} already exists",
                new_login
            )));
        }

        info!(login = %login, new_login = %new_login, modified_by = %modified_by, "Updating login");

        self.repository
            .update_fields(
                target.id(),
                UserChange::Login(new_login.to_string()),
                modified_by,
            )
            .await
    }

    /// Replace the password. Owner or administrator.
    pub async fn update_password(
        &self,
        login: &str,
        new_password: &str,
        modified_by: &str,
    ) -> Result<UserId, DomainError> {
        let target = self.resolve_with_access(login, modified_by).await?;

        self.validation.validate_password(new_password).map_err(invalid)?;

        info!(login = %login, modified_by = %modified_by, "Updating password");

        self.repository
            .update_fields(
                target.id(),
                UserChange::Password(new_password.to_string()),
                modified_by,
            )
            .await
    }

    /// Read an account's public profile. Owner or administrator.
    pub async fn get_user_by_login(
        &self,
        login: &str,
        requested_by: &str,
    ) -> Result<UserProfile, DomainError> {
        let target = self.resolve_with_access(login, requested_by).await?;
        Ok(target.profile())
    }

    /// Read an account after checking its password. Owner or administrator.
    pub async fn get_by_login_and_password(
        &self,
        login: &str,
        password: &str,
        requested_by: &str,
    ) -> Result<User, DomainError> {
        let target = match self
            .repository
            .find_by_login_and_credential(login, password)
            .await
        {
            Ok(user) => user,
            Err(DomainError::NotFound { .. }) => return Err(DomainError::authentication()),
            Err(e) => return Err(e),
        };

        self.policy
            .authorize(requested_by, &target, AccessScope::OwnerOrAdmin)
            .await?;

        Ok(target)
    }

    /// All active accounts, oldest first. Administrators only.
    pub async fn get_active_users(&self, requested_by: &str) -> Result<Vec<User>, DomainError> {
        self.policy.require_admin(requested_by, "active users").await?;
        self.repository.list_active().await
    }

    /// Active accounts at least `age` years old today. Administrators only.
    pub async fn get_users_older_than(
        &self,
        age: i32,
        requested_by: &str,
    ) -> Result<Vec<User>, DomainError> {
        self.policy.require_admin(requested_by, "users by age").await?;

        let age = u32::try_from(age).map_err(|_| invalid(UserValidationError::NegativeAge(age)))?;
        let today = Utc::now().date_naive();

        self.repository.list_older_than(age, today).await
    }

    /// Remove an account permanently. Administrators only.
    pub async fn delete_user_force(
        &self,
        login: &str,
        requested_by: &str,
    ) -> Result<UserId, DomainError> {
        self.policy.require_admin(requested_by, login).await?;
        let target = self.repository.find_by_login(login).await?;

        info!(login = %login, requested_by = %requested_by, "Deleting user permanently");

        self.repository.force_delete(target.id()).await
    }

    /// Revoke an account. Administrators only.
    pub async fn delete_user(&self, login: &str, revoked_by: &str) -> Result<UserId, DomainError> {
        self.policy.require_admin(revoked_by, login).await?;
        let target = self.repository.find_by_login(login).await?;

        info!(login = %login, revoked_by = %revoked_by, "Revoking user");

        self.repository.soft_delete(target.id(), revoked_by).await
    }

    /// Clear an account's revocation. Administrators only.
    pub async fn restore_user(
        &self,
        login: &str,
        requested_by: &str,
    ) -> Result<UserId, DomainError> {
        self.policy.require_admin(requested_by, login).await?;
        let target = self.repository.find_by_login(login).await?;

        info!(login = %login, requested_by = %requested_by, "Restoring user");

        self.repository.restore(target.id()).await
    }

    async fn resolve_with_access(&self, login: &str, requested_by: &str) -> Result<User, DomainError> {
        let target = self.repository.find_by_login(login).await?;

        self.policy
            .authorize(requested_by, &target, AccessScope::OwnerOrAdmin)
            .await?;

        Ok(target)
    }

    async fn login_taken(&self, login: &str) -> Result<bool, DomainError> {
        match self.repository.find_by_login(login).await {
            Ok(_) => Ok(true),
            Err(DomainError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
