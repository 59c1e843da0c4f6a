//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{
    age_on, Gender, NewUser, User, UserChange, UserId, UserParts, UserRepository,
};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// Mutable storage-side representation; converted to [`User`] on the way out
#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    login: String,
    password_hash: String,
    name: String,
    gender: Gender,
    birthday: Option<NaiveDate>,
    admin: bool,
    created_at: DateTime<Utc>,
    created_by: String,
    modified_at: DateTime<Utc>,
    modified_by: String,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl UserRecord {
    fn to_user(&self) -> User {
        User::from(UserParts {
            id: self.id,
            login: self.login.clone(),
            password_hash: self.password_hash.clone(),
            name: self.name.clone(),
            gender: self.gender,
            birthday: self.birthday,
            admin: self.admin,
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            modified_at: self.modified_at,
            modified_by: self.modified_by.clone(),
            revoked_at: self.revoked_at,
            revoked_by: self.revoked_by.clone(),
        })
    }

    fn touch(&mut self, by: &str) {
        self.modified_at = Utc::now();
        self.modified_by = by.to_string();
    }
}

/// In-memory implementation of UserRepository
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    /// Index for login -> user ID lookup
    login_index: Arc<RwLock<HashMap<String, UserId>>>,
    hasher: Arc<dyn PasswordHasher>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            login_index: Arc::new(RwLock::new(HashMap::new())),
            hasher,
        }
    }
}

fn no_such_login(login: &str) -> DomainError {
    DomainError::not_found(format!("No users found with login {}", login))
}

fn no_such_id(id: UserId) -> DomainError {
    DomainError::not_found(format!("No users found with ID {}", id))
}

fn login_taken(login: &str) -> DomainError {
    DomainError::conflict(format!("User with login {} already exists", login))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<UserId, DomainError> {
        // Hash outside the locks
        let password_hash = self.hasher.hash(&user.password)?;

        let mut users = self.users.write().await;
        let mut login_index = self.login_index.write().await;

        if login_index.contains_key(&user.login) {
            return Err(login_taken(&user.login));
        }

        let now = Utc::now();
        let id = UserId::generate();
        let record = UserRecord {
            id,
            login: user.login.clone(),
            password_hash,
            name: user.name,
            gender: user.gender,
            birthday: user.birthday,
            admin: user.admin,
            created_at: now,
            created_by: user.created_by.clone(),
            modified_at: now,
            modified_by: user.created_by,
            revoked_at: None,
            revoked_by: None,
        };

        login_index.insert(user.login, id);
        users.insert(id, record);

        Ok(id)
    }

    async fn find_by_login(&self, login: &str) -> Result<User, DomainError> {
        let users = self.users.read().await;
        let login_index = self.login_index.read().await;

        login_index
            .get(login)
            .and_then(|id| users.get(id))
            .map(UserRecord::to_user)
            .ok_or_else(|| no_such_login(login))
    }

    async fn find_by_login_and_credential(
        &self,
        login: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        let user = self.find_by_login(login).await?;

        if !self.hasher.verify(password, user.password_hash()) {
            return Err(no_such_login(login));
        }

        Ok(user)
    }

    async fn update_fields(
        &self,
        id: UserId,
        change: UserChange,
        modified_by: &str,
    ) -> Result<UserId, DomainError> {
        let new_hash = match &change {
            UserChange::Password(password) => Some(self.hasher.hash(password)?),
            _ => None,
        };

        let mut users = self.users.write().await;
        let mut login_index = self.login_index.write().await;

        let record = users.get_mut(&id).ok_or_else(|| no_such_id(id))?;

        match change {
            UserChange::PersonalInfo {
                name,
                gender,
                birthday,
            } => {
                record.name = name;
                record.gender = gender;
                record.birthday = birthday;
            }
            UserChange::Login(new_login) => {
                if new_login != record.login {
                    if login_index.contains_key(&new_login) {
                        return Err(login_taken(&new_login));
                    }

                    login_index.remove(&record.login);
                    login_index.insert(new_login.clone(), id);
                    record.login = new_login;
                }
            }
            UserChange::Password(_) => {
                if let Some(hash) = new_hash {
                    record.password_hash = hash;
                }
            }
        }

        record.touch(modified_by);

        Ok(id)
    }

    async fn soft_delete(&self, id: UserId, revoked_by: &str) -> Result<UserId, DomainError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(&id).ok_or_else(|| no_such_id(id))?;

        record.revoked_at = Some(Utc::now());
        record.revoked_by = Some(revoked_by.to_string());
        record.touch(revoked_by);

        Ok(id)
    }

    async fn restore(&self, id: UserId) -> Result<UserId, DomainError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(&id).ok_or_else(|| no_such_id(id))?;

        record.revoked_at = None;
        record.revoked_by = None;

        Ok(id)
    }

    async fn force_delete(&self, id: UserId) -> Result<UserId, DomainError> {
        let mut users = self.users.write().await;
        let mut login_index = self.login_index.write().await;

        let record = users.remove(&id).ok_or_else(|| no_such_id(id))?;
        login_index.remove(&record.login);

        Ok(id)
    }

    async fn list_active(&self) -> Result<Vec<User>, DomainError> {
        let users = self.users.read().await;

        let mut active: Vec<&UserRecord> =
            users.values().filter(|r| r.revoked_at.is_none()).collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.login.cmp(&b.login)));

        Ok(active.into_iter().map(UserRecord::to_user).collect())
    }

    async fn list_older_than(
        &self,
        age: u32,
        as_of: NaiveDate,
    ) -> Result<Vec<User>, DomainError> {
        let threshold = i64::from(age);

        Ok(self
            .list_active()
            .await?
            .into_iter()
            .filter(|u| {
                u.birthday()
                    .is_some_and(|b| i64::from(age_on(b, as_of)) >= threshold)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::user::password::Argon2Hasher;

    fn create_repository() -> InMemoryUserRepository {
        InMemoryUserRepository::new(Arc::new(Argon2Hasher::new()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_user(login: &str, birthday: Option<NaiveDate>) -> NewUser {
        NewUser {
            login: login.to_string(),
            password: "secret1".to_string(),
            name: "Test".to_string(),
            gender: Gender::Unspecified,
            birthday,
            admin: false,
            created_by: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = create_repository();

        let id = repo.create(new_user("bob", None)).await.unwrap();

        let user = repo.find_by_login("bob").await.unwrap();
        assert_eq!(user.id(), id);
        assert_eq!(user.created_by(), "admin");
        assert_eq!(user.modified_by(), "admin");
        assert_eq!(user.created_at(), user.modified_at());
        assert!(user.is_active());
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let repo = create_repository();
        repo.create(new_user("bob", None)).await.unwrap();

        let user = repo.find_by_login("bob").await.unwrap();
        assert_ne!(user.password_hash(), "secret1");
        assert!(user.password_hash().starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_find_missing_login_names_key() {
        let repo = create_repository();

        let err = repo.find_by_login("ghost").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_find_by_login_and_credential() {
        let repo = create_repository();
        repo.create(new_user("bob", None)).await.unwrap();

        assert!(repo.find_by_login_and_credential("bob", "secret1").await.is_ok());

        let wrong = repo.find_by_login_and_credential("bob", "nope").await;
        assert!(matches!(wrong, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_login() {
        let repo = create_repository();
        repo.create(new_user("bob", None)).await.unwrap();

        let result = repo.create(new_user("bob", None)).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_for_one_login_have_single_winner() {
        let repo = Arc::new(create_repository());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(new_user("bob", None)).await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(id) => winners.push(id),
                Err(e) => assert!(matches!(e, DomainError::Conflict { .. })),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(repo.find_by_login("bob").await.unwrap().id(), winners[0]);
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_personal_info_stamps_modifier() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();
        let before = repo.find_by_login("bob").await.unwrap();

        repo.update_fields(
            id,
            UserChange::PersonalInfo {
                name: "Robert".to_string(),
                gender: Gender::Male,
                birthday: Some(date(1990, 5, 17)),
            },
            "bob",
        )
        .await
        .unwrap();

        let after = repo.find_by_login("bob").await.unwrap();
        assert_eq!(after.name(), "Robert");
        assert_eq!(after.gender(), Gender::Male);
        assert_eq!(after.birthday(), Some(date(1990, 5, 17)));
        assert_eq!(after.modified_by(), "bob");
        assert!(after.modified_at() >= before.modified_at());
        assert_eq!(after.created_at(), before.created_at());
        assert_eq!(after.created_by(), "admin");
    }

    #[tokio::test]
    async fn test_update_login_moves_index() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();

        repo.update_fields(id, UserChange::Login("robert".to_string()), "admin")
            .await
            .unwrap();

        assert!(repo.find_by_login("bob").await.is_err());
        assert_eq!(repo.find_by_login("robert").await.unwrap().id(), id);
    }

    #[tokio::test]
    async fn test_update_login_conflict_leaves_record() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();
        repo.create(new_user("alice", None)).await.unwrap();

        let result = repo
            .update_fields(id, UserChange::Login("alice".to_string()), "admin")
            .await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        let bob = repo.find_by_login("bob").await.unwrap();
        assert_eq!(bob.id(), id);
        assert_eq!(bob.modified_by(), "admin");
    }

    #[tokio::test]
    async fn test_update_password_rehashes() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();

        repo.update_fields(id, UserChange::Password("fresh2".to_string()), "bob")
            .await
            .unwrap();

        assert!(repo.find_by_login_and_credential("bob", "secret1").await.is_err());
        assert!(repo.find_by_login_and_credential("bob", "fresh2").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let repo = create_repository();

        let result = repo
            .update_fields(UserId::generate(), UserChange::Login("x".to_string()), "admin")
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();

        repo.soft_delete(id, "admin").await.unwrap();
        let revoked = repo.find_by_login("bob").await.unwrap();
        assert!(!revoked.is_active());
        assert_eq!(revoked.revoked_by(), Some("admin"));

        repo.restore(id).await.unwrap();
        let restored = repo.find_by_login("bob").await.unwrap();
        assert!(restored.is_active());
        assert!(restored.revoked_by().is_none());
        assert_eq!(restored.name(), "Test");
    }

    #[tokio::test]
    async fn test_force_delete_frees_login() {
        let repo = create_repository();
        let id = repo.create(new_user("bob", None)).await.unwrap();

        repo.force_delete(id).await.unwrap();
        assert!(repo.find_by_login("bob").await.is_err());
        assert!(repo.force_delete(id).await.is_err());

        assert!(repo.create(new_user("bob", None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_active_excludes_revoked_and_is_ordered() {
        let repo = create_repository();
        repo.create(new_user("first", None)).await.unwrap();
        let second = repo.create(new_user("second", None)).await.unwrap();
        repo.create(new_user("third", None)).await.unwrap();

        repo.soft_delete(second, "admin").await.unwrap();

        let active = repo.list_active().await.unwrap();
        let logins: Vec<&str> = active.iter().map(|u| u.login()).collect();
        assert_eq!(logins, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_list_older_than() {
        let repo = create_repository();
        repo.create(new_user("late", Some(date(2000, 12, 31)))).await.unwrap();
        repo.create(new_user("early", Some(date(2000, 1, 1)))).await.unwrap();
        repo.create(new_user("unknown", None)).await.unwrap();
        let revoked = repo
            .create(new_user("gone", Some(date(1950, 1, 1))))
            .await
            .unwrap();
        repo.soft_delete(revoked, "admin").await.unwrap();

        let as_of = date(2024, 6, 1);

        let at_least_24: Vec<String> = repo
            .list_older_than(24, as_of)
            .await
            .unwrap()
            .iter()
            .map(|u| u.login().to_string())
            .collect();
        assert_eq!(at_least_24, vec!["early"]);

        let at_least_23 = repo.list_older_than(23, as_of).await.unwrap();
        assert_eq!(at_least_23.len(), 2);
    }
}
