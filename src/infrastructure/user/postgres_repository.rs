//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::user::{
    age_on, Gender, NewUser, User, UserChange, UserId, UserParts, UserRepository,
};
use crate::domain::DomainError;

use super::password::PasswordHasher;

const USER_COLUMNS: &str = "id, login, password_hash, name, gender, birthday, admin, \
     created_at, created_by, modified_at, modified_by, revoked_at, revoked_by";

/// PostgreSQL implementation of UserRepository.
///
/// Login uniqueness is backed by a unique index so that concurrent creates or
/// renames racing for the same login resolve to a single winner.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
    hasher: Arc<dyn PasswordHasher>,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { pool, hasher }
    }

    /// Create the users table and its indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                login TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                gender INTEGER NOT NULL CHECK (gender BETWEEN 0 AND 2),
                birthday DATE,
                admin BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                created_by TEXT NOT NULL,
                modified_at TIMESTAMPTZ NOT NULL,
                modified_by TEXT NOT NULL,
                revoked_at TIMESTAMPTZ,
                revoked_by TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create users table: {}", e)))?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_login_key ON users (login)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create login index: {}", e)))?;

        Ok(())
    }

    async fn fetch_by_login(&self, login: &str) -> Result<User, DomainError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE login = $1"))
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by login: {}", e)))?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(no_such_login(login)),
        }
    }

    async fn fetch_active(&self) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE revoked_at IS NULL ORDER BY created_at, login"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list active users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }
}

fn no_such_login(login: &str) -> DomainError {
    DomainError::not_found(format!("No users found with login {}", login))
}

fn no_such_id(id: UserId) -> DomainError {
    DomainError::not_found(format!("No users found with ID {}", id))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn expect_affected(result: sqlx::postgres::PgQueryResult, id: UserId) -> Result<UserId, DomainError> {
    if result.rows_affected() == 0 {
        return Err(no_such_id(id));
    }

    Ok(id)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<UserId, DomainError> {
        let password_hash = self.hasher.hash(&user.password)?;
        let id = UserId::generate();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, login, password_hash, name, gender, birthday, admin,
                               created_at, created_by, modified_at, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $8, $9)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.login)
        .bind(&password_hash)
        .bind(user.gender.code())
        .bind(user.birthday)
        .bind(user.admin)
        .bind(now)
        .bind(&user.created_by)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict(format!("User with login {} already exists", user.login))
            } else {
                DomainError::storage(format!("Failed to create user {}: {}", user.login, e))
            }
        })?;

        Ok(id)
    }

    async fn find_by_login(&self, login: &str) -> Result<User, DomainError> {
        self.fetch_by_login(login).await
    }

    async fn find_by_login_and_credential(
        &self,
        login: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        let user = self.fetch_by_login(login).await?;

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
        let now = Utc::now();

        let result = match change {
            UserChange::PersonalInfo {
                name,
                gender,
                birthday,
            } => sqlx::query(
                r#"
                UPDATE users
                SET name = $2, gender = $3, birthday = $4, modified_at = $5, modified_by = $6
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(name)
            .bind(gender.code())
            .bind(birthday)
            .bind(now)
            .bind(modified_by)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update user {}: {}", id, e)))?,

            UserChange::Login(login) => sqlx::query(
                "UPDATE users SET login = $2, modified_at = $3, modified_by = $4 WHERE id = $1",
            )
            .bind(id.as_uuid())
            .bind(&login)
            .bind(now)
            .bind(modified_by)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict(format!("User with login {} already exists", login))
                } else {
                    DomainError::storage(format!("Failed to update login of {}: {}", id, e))
                }
            })?,

            UserChange::Password(password) => {
                let password_hash = self.hasher.hash(&password)?;

                sqlx::query(
                    "UPDATE users SET password_hash = $2, modified_at = $3, modified_by = $4 WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(password_hash)
                .bind(now)
                .bind(modified_by)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to update password of {}: {}", id, e))
                })?
            }
        };

        expect_affected(result, id)
    }

    async fn soft_delete(&self, id: UserId, revoked_by: &str) -> Result<UserId, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET revoked_at = $2, revoked_by = $3, modified_at = $2, modified_by = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(Utc::now())
        .bind(revoked_by)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to revoke user {}: {}", id, e)))?;

        expect_affected(result, id)
    }

    async fn restore(&self, id: UserId) -> Result<UserId, DomainError> {
        let result =
            sqlx::query("UPDATE users SET revoked_at = NULL, revoked_by = NULL WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to restore user {}: {}", id, e)))?;

        expect_affected(result, id)
    }

    async fn force_delete(&self, id: UserId) -> Result<UserId, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete user {}: {}", id, e)))?;

        expect_affected(result, id)
    }

    async fn list_active(&self) -> Result<Vec<User>, DomainError> {
        self.fetch_active().await
    }

    async fn list_older_than(
        &self,
        age: u32,
        as_of: NaiveDate,
    ) -> Result<Vec<User>, DomainError> {
        let threshold = i64::from(age);

        Ok(self
            .fetch_active()
            .await?
            .into_iter()
            .filter(|u| {
                u.birthday()
                    .is_some_and(|b| i64::from(age_on(b, as_of)) >= threshold)
            })
            .collect())
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, DomainError> {
    let column = |e: sqlx::Error| DomainError::storage(format!("Invalid user row: {}", e));

    let id: Uuid = row.try_get("id").map_err(column)?;
    let gender: i32 = row.try_get("gender").map_err(column)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(column)?;
    let modified_at: DateTime<Utc> = row.try_get("modified_at").map_err(column)?;

    let gender = Gender::try_from(gender)
        .map_err(|e| DomainError::storage(format!("Invalid gender in database: {}", e)))?;

    Ok(User::from(UserParts {
        id: UserId::from_uuid(id),
        login: row.try_get("login").map_err(column)?,
        password_hash: row.try_get("password_hash").map_err(column)?,
        name: row.try_get("name").map_err(column)?,
        gender,
        birthday: row.try_get("birthday").map_err(column)?,
        admin: row.try_get("admin").map_err(column)?,
        created_at,
        created_by: row.try_get("created_by").map_err(column)?,
        modified_at,
        modified_by: row.try_get("modified_by").map_err(column)?,
        revoked_at: row.try_get("revoked_at").map_err(column)?,
        revoked_by: row.try_get("revoked_by").map_err(column)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages_carry_key() {
        assert!(no_such_login("bob").to_string().contains("bob"));

        let id = UserId::generate();
        assert!(no_such_id(id).to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
