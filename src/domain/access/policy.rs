//! Access decisions for account operations

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::user::{User, UserRepository};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Which requesters an operation admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// The account's own active holder, or any administrator
    OwnerOrAdmin,
    /// Administrators only, regardless of target
    AdminOnly,
}

/// Resolved identity of whoever issued a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    login: String,
    admin: bool,
    active: bool,
}

impl Requester {
    /// Requester backed by a stored account
    pub fn from_account(account: &User) -> Self {
        Self {
            login: account.login().to_string(),
            admin: account.is_admin(),
            active: account.is_active(),
        }
    }

    /// Requester whose account could not be resolved
    pub fn unresolved(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            admin: false,
            active: false,
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Revoked administrators lose their privileges
    pub fn is_admin(&self) -> bool {
        self.admin && self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn owns(&self, target: &User) -> bool {
        self.active && target.is_active() && self.login == target.login()
    }
}

/// Decide whether `requester` may act on `target` within `scope`
pub fn evaluate(requester: &Requester, target: &User, scope: AccessScope) -> bool {
    match scope {
        AccessScope::AdminOnly => requester.is_admin(),
        AccessScope::OwnerOrAdmin => requester.is_admin() || requester.owns(target),
    }
}

/// Capability for resolving a requester's own account
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RequesterLookup: Send + Sync + Debug {
    async fn lookup(&self, login: &str) -> Result<User, DomainError>;
}

/// [`RequesterLookup`] over an account store
#[derive(Debug)]
pub struct StoreLookup<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> StoreLookup<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: UserRepository> RequesterLookup for StoreLookup<R> {
    async fn lookup(&self, login: &str) -> Result<User, DomainError> {
        self.repository.find_by_login(login).await
    }
}

/// Policy engine. Holds the lookup used to decide whether a requester is an
/// administrator; any lookup failure resolves to a non-admin requester.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    lookup: Arc<dyn RequesterLookup>,
}

impl AccessPolicy {
    pub fn new(lookup: Arc<dyn RequesterLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve the requester, failing closed
    pub async fn resolve(&self, login: &str) -> Requester {
        match self.lookup.lookup(login).await {
            Ok(account) => Requester::from_account(&account),
            Err(DomainError::NotFound { .. }) => {
                debug!(requester = %login, "Requester has no account");
                Requester::unresolved(login)
            }
            Err(e) => {
                warn!(requester = %login, error = %e, "Requester lookup failed, treating as non-admin");
                Requester::unresolved(login)
            }
        }
    }

    /// Check access to an already resolved target account
    pub async fn authorize(
        &self,
        requester_login: &str,
        target: &User,
        scope: AccessScope,
    ) -> Result<(), DomainError> {
        let requester = if requester_login == target.login() {
            Requester::from_account(target)
        } else {
            self.resolve(requester_login).await
        };

        if evaluate(&requester, target, scope) {
            return Ok(());
        }

        warn!(requester = %requester_login, target = %target.login(), ?scope, "Access denied");
        Err(denied(target.login()))
    }

    /// Check that the requester is an active administrator.
    ///
    /// `resource` names what is being accessed and ends up in the denial message.
    pub async fn require_admin(
        &self,
        requester_login: &str,
        resource: &str,
    ) -> Result<(), DomainError> {
        if self.resolve(requester_login).await.is_admin() {
            return Ok(());
        }

        warn!(requester = %requester_login, resource = %resource, "Administrator access denied");
        Err(denied(resource))
    }
}

fn denied(target: &str) -> DomainError {
    DomainError::access_denied(format!("Access to '{}' is not allowed", target))
}
