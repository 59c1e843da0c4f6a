//! User entity and related types

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::UserValidationError;

/// Opaque account identifier, assigned at creation and never changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gender codes accepted on the wire: 0, 1 and 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Gender {
    Female,
    Male,
    Unspecified,
}

impl Gender {
    pub fn code(&self) -> i32 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
            Self::Unspecified => 2,
        }
    }
}

impl TryFrom<i32> for Gender {
    type Error = UserValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Female),
            1 => Ok(Self::Male),
            2 => Ok(Self::Unspecified),
            other => Err(UserValidationError::InvalidGender(other)),
        }
    }
}

impl From<Gender> for i32 {
    fn from(gender: Gender) -> Self {
        gender.code()
    }
}

/// Role carried in session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn from_admin_flag(admin: bool) -> Self {
        if admin { Self::Admin } else { Self::User }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw field values a store uses to rebuild a [`User`]
#[derive(Debug, Clone)]
pub struct UserParts {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
    pub name: String,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_at: DateTime<Utc>,
    pub modified_by: String,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
}

/// User account. Immutable once built; changes go through the store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    id: UserId,
    login: String,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing)]
    password_hash: String,
    name: String,
    gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    birthday: Option<NaiveDate>,
    admin: bool,
    created_at: DateTime<Utc>,
    created_by: String,
    modified_at: DateTime<Utc>,
    modified_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_by: Option<String>,
}

impl From<UserParts> for User {
    fn from(parts: UserParts) -> Self {
        Self {
            id: parts.id,
            login: parts.login,
            password_hash: parts.password_hash,
            name: parts.name,
            gender: parts.gender,
            birthday: parts.birthday,
            admin: parts.admin,
            created_at: parts.created_at,
            created_by: parts.created_by,
            modified_at: parts.modified_at,
            modified_by: parts.modified_by,
            revoked_at: parts.revoked_at,
            revoked_by: parts.revoked_by,
        }
    }
}

impl User {
    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.admin)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn modified_by(&self) -> &str {
        &self.modified_by
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    pub fn revoked_by(&self) -> Option<&str> {
        self.revoked_by.as_deref()
    }

    // Status checks

    /// Active accounts have never been revoked, or have been restored
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Age in whole years on `as_of`, if the birthday is known
    pub fn age_on(&self, as_of: NaiveDate) -> Option<i32> {
        self.birthday.map(|birthday| age_on(birthday, as_of))
    }

    /// Sanitized view without credential material
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            login: self.login.clone(),
            name: self.name.clone(),
            gender: self.gender,
            birthday: self.birthday,
            active: self.is_active(),
        }
    }

    /// Decompose into raw parts
    pub fn into_parts(self) -> UserParts {
        UserParts {
            id: self.id,
            login: self.login,
            password_hash: self.password_hash,
            name: self.name,
            gender: self.gender,
            birthday: self.birthday,
            admin: self.admin,
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: self.modified_at,
            modified_by: self.modified_by,
            revoked_at: self.revoked_at,
            revoked_by: self.revoked_by,
        }
    }
}

/// Whole years between `birthday` and `as_of`. A year only counts once the
/// birthday's month and day have been reached; Feb 29 births turn over on
/// Mar 1 in common years.
pub fn age_on(birthday: NaiveDate, as_of: NaiveDate) -> i32 {
    let mut age = as_of.year() - birthday.year();

    if (as_of.month(), as_of.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }

    age
}

/// Public profile returned to readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub login: String,
    pub name: String,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    pub active: bool,
}

/// Fields for a new account. The password is plaintext here and is hashed by
/// the store before it is persisted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password: String,
    pub name: String,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub admin: bool,
    pub created_by: String,
}

/// Partial update applied to one account
#[derive(Debug, Clone, PartialEq)]
pub enum UserChange {
    PersonalInfo {
        name: String,
        gender: Gender,
        birthday: Option<NaiveDate>,
    },
    Login(String),
    /// Plaintext; the store hashes it
    Password(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_user(login: &str, admin: bool) -> User {
        let now = Utc::now();
        User::from(UserParts {
            id: UserId::generate(),
            login: login.to_string(),
            password_hash: "hashed_password".to_string(),
            name: "Bob".to_string(),
            gender: Gender::Male,
            birthday: Some(date(2000, 12, 31)),
            admin,
            created_at: now,
            created_by: "admin".to_string(),
            modified_at: now,
            modified_by: "admin".to_string(),
            revoked_at: None,
            revoked_by: None,
        })
    }

    #[test]
    fn test_gender_round_trip_codes() {
        for code in 0..=2 {
            assert_eq!(Gender::try_from(code).unwrap().code(), code);
        }
        assert!(Gender::try_from(7).is_err());
    }

    #[test]
    fn test_gender_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Gender::Unspecified).unwrap(), "2");
        let parsed: Gender = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Gender::Female);
        assert!(serde_json::from_str::<Gender>("5").is_err());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::from_admin_flag(true).as_str(), "Admin");
        assert_eq!(Role::from_admin_flag(false).as_str(), "User");
    }

    #[test]
    fn test_user_creation() {
        let user = create_test_user("bob", false);

        assert_eq!(user.login(), "bob");
        assert!(user.is_active());
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.created_by(), "admin");
        assert!(user.revoked_by().is_none());
    }

    #[test]
    fn test_revoked_user_is_inactive() {
        let mut parts = create_test_user("bob", false).into_parts();
        parts.revoked_at = Some(Utc::now());
        parts.revoked_by = Some("admin".to_string());

        let user = User::from(parts);
        assert!(!user.is_active());
        assert!(!user.profile().active);
        assert_eq!(user.revoked_by(), Some("admin"));
    }

    #[test]
    fn test_age_before_birthday_this_year() {
        assert_eq!(age_on(date(2000, 12, 31), date(2024, 6, 1)), 23);
    }

    #[test]
    fn test_age_on_birthday() {
        assert_eq!(age_on(date(2000, 12, 31), date(2024, 12, 31)), 24);
        assert_eq!(age_on(date(2000, 12, 31), date(2024, 12, 30)), 23);
    }

    #[test]
    fn test_age_leap_day_birthday() {
        assert_eq!(age_on(date(2004, 2, 29), date(2023, 2, 28)), 18);
        assert_eq!(age_on(date(2004, 2, 29), date(2023, 3, 1)), 19);
        assert_eq!(age_on(date(2004, 2, 29), date(2024, 2, 29)), 20);
    }

    #[test]
    fn test_user_age_without_birthday() {
        let mut parts = create_test_user("bob", false).into_parts();
        parts.birthday = None;
        assert!(User::from(parts).age_on(date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_profile_has_no_credential() {
        let user = create_test_user("bob", false);
        let profile = user.profile();

        assert_eq!(profile.login, "bob");
        assert_eq!(profile.name, "Bob");
        assert_eq!(profile.gender, Gender::Male);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("hashed_password"));
    }

    #[test]
    fn test_user_serialization_excludes_password() {
        let user = create_test_user("admin", true);

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("password_hash"));
    }
}
