//! User validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::entity::Gender;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Login cannot be empty")]
    EmptyLogin,

    #[error("Login exceeds maximum length of {0} characters")]
    LoginTooLong(usize),

    #[error("Login '{0}' can only contain letters and numbers")]
    InvalidLogin(String),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Name '{0}' contains characters that are not allowed")]
    InvalidName(String),

    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),

    #[error("Password can only contain letters and numbers")]
    InvalidPassword,

    #[error("Gender must be 0, 1 or 2, got {0}")]
    InvalidGender(i32),

    #[error("Age threshold must not be negative, got {0}")]
    NegativeAge(i32),

    #[error("Invalid validation pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

const MAX_LOGIN_LENGTH: usize = 50;
const MAX_NAME_LENGTH: usize = 100;
const MAX_PASSWORD_LENGTH: usize = 128;

pub const STRICT_PATTERN: &str = r"^[a-zA-Z0-9]+$";
pub const CYRILLIC_NAME_PATTERN: &str = r"^[a-zA-Zа-яА-ЯёЁ0-9]+$";

static STRICT: Lazy<Regex> = Lazy::new(|| Regex::new(STRICT_PATTERN).unwrap());
static CYRILLIC_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(CYRILLIC_NAME_PATTERN).unwrap());

/// Character-set rules applied to logins, display names and passwords.
///
/// The strict policy admits only ASCII letters and digits everywhere. Deployments
/// serving Cyrillic-speaking users can relax the name rule with
/// [`ValidationPolicy::with_cyrillic_names`] or supply custom patterns.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    login: Regex,
    name: Regex,
    password: Regex,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl ValidationPolicy {
    /// Letters and digits only, ASCII
    pub fn strict() -> Self {
        Self {
            login: Regex::clone(&STRICT),
            name: Regex::clone(&STRICT),
            password: Regex::clone(&STRICT),
        }
    }

    /// Strict logins and passwords, names may also use Cyrillic letters
    pub fn with_cyrillic_names() -> Self {
        Self {
            name: Regex::clone(&CYRILLIC_NAME),
            ..Self::strict()
        }
    }

    /// Build a policy from raw patterns
    pub fn from_patterns(
        login: &str,
        name: &str,
        password: &str,
    ) -> Result<Self, UserValidationError> {
        Ok(Self {
            login: compile(login)?,
            name: compile(name)?,
            password: compile(password)?,
        })
    }

    /// Validate a login
    ///
    /// Rules:
    /// - Cannot be empty
    /// - Maximum 50 characters
    /// - Must match the login pattern
    pub fn validate_login(&self, login: &str) -> Result<(), UserValidationError> {
        if login.is_empty() {
            return Err(UserValidationError::EmptyLogin);
        }

        if login.chars().count() > MAX_LOGIN_LENGTH {
            return Err(UserValidationError::LoginTooLong(MAX_LOGIN_LENGTH));
        }

        if !self.login.is_match(login) {
            return Err(UserValidationError::InvalidLogin(login.to_string()));
        }

        Ok(())
    }

    /// Validate a display name
    pub fn validate_name(&self, name: &str) -> Result<(), UserValidationError> {
        if name.is_empty() {
            return Err(UserValidationError::EmptyName);
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(UserValidationError::NameTooLong(MAX_NAME_LENGTH));
        }

        if !self.name.is_match(name) {
            return Err(UserValidationError::InvalidName(name.to_string()));
        }

        Ok(())
    }

    /// Validate a plaintext password before it is hashed.
    ///
    /// The offending value is never echoed back.
    pub fn validate_password(&self, password: &str) -> Result<(), UserValidationError> {
        if password.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }

        if password.chars().count() > MAX_PASSWORD_LENGTH {
            return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
        }

        if !self.password.is_match(password) {
            return Err(UserValidationError::InvalidPassword);
        }

        Ok(())
    }
}

/// Parse the numeric gender code
pub fn validate_gender(code: i32) -> Result<Gender, UserValidationError> {
    Gender::try_from(code)
}

fn compile(pattern: &str) -> Result<Regex, UserValidationError> {
    Regex::new(pattern).map_err(|e| UserValidationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_logins() {
        let policy = ValidationPolicy::strict();
        assert!(policy.validate_login("admin").is_ok());
        assert!(policy.validate_login("Bob42").is_ok());
        assert!(policy.validate_login("a").is_ok());
    }

    #[test]
    fn test_empty_login() {
        let policy = ValidationPolicy::strict();
        assert_eq!(
            policy.validate_login(""),
            Err(UserValidationError::EmptyLogin)
        );
    }

    #[test]
    fn test_login_too_long() {
        let policy = ValidationPolicy::strict();
        let long_login = "a".repeat(51);
        assert_eq!(
            policy.validate_login(&long_login),
            Err(UserValidationError::LoginTooLong(50))
        );
    }

    #[test]
    fn test_login_invalid_characters() {
        let policy = ValidationPolicy::strict();
        assert_eq!(
            policy.validate_login("bob_smith"),
            Err(UserValidationError::InvalidLogin("bob_smith".to_string()))
        );
        assert!(policy.validate_login("bob smith").is_err());
        assert!(policy.validate_login("боб").is_err());
    }

    #[test]
    fn test_strict_names() {
        let policy = ValidationPolicy::strict();
        assert!(policy.validate_name("Bob").is_ok());
        assert!(policy.validate_name("Борис").is_err());
        assert_eq!(policy.validate_name(""), Err(UserValidationError::EmptyName));
    }

    #[test]
    fn test_cyrillic_names() {
        let policy = ValidationPolicy::with_cyrillic_names();
        assert!(policy.validate_name("Борис").is_ok());
        assert!(policy.validate_name("Ёжик").is_ok());
        assert!(policy.validate_name("Bob").is_ok());
        assert!(policy.validate_name("Bob!").is_err());
        // logins stay ASCII
        assert!(policy.validate_login("борис").is_err());
    }

    #[test]
    fn test_name_too_long() {
        let policy = ValidationPolicy::strict();
        let long_name = "a".repeat(101);
        assert_eq!(
            policy.validate_name(&long_name),
            Err(UserValidationError::NameTooLong(100))
        );
    }

    #[test]
    fn test_passwords() {
        let policy = ValidationPolicy::strict();
        assert!(policy.validate_password("pw1").is_ok());
        assert_eq!(
            policy.validate_password(""),
            Err(UserValidationError::EmptyPassword)
        );
        assert_eq!(
            policy.validate_password("p@ss"),
            Err(UserValidationError::InvalidPassword)
        );
        assert_eq!(
            policy.validate_password(&"a".repeat(129)),
            Err(UserValidationError::PasswordTooLong(128))
        );
    }

    #[test]
    fn test_password_error_does_not_echo_value() {
        let policy = ValidationPolicy::strict();
        let err = policy.validate_password("secret!").unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(validate_gender(0), Ok(Gender::Female));
        assert_eq!(validate_gender(1), Ok(Gender::Male));
        assert_eq!(validate_gender(2), Ok(Gender::Unspecified));
        assert_eq!(validate_gender(3), Err(UserValidationError::InvalidGender(3)));
        assert_eq!(
            validate_gender(-1),
            Err(UserValidationError::InvalidGender(-1))
        );
    }

    #[test]
    fn test_custom_patterns() {
        let policy = ValidationPolicy::from_patterns(r"^[a-z]+$", r"^.+$", r"^\S+$").unwrap();
        assert!(policy.validate_login("bob").is_ok());
        assert!(policy.validate_login("Bob").is_err());
        assert!(policy.validate_name("Anything goes!").is_ok());
        assert!(policy.validate_password("p@ss!").is_ok());
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let result = ValidationPolicy::from_patterns("([", STRICT_PATTERN, STRICT_PATTERN);
        assert!(matches!(
            result,
            Err(UserValidationError::InvalidPattern { .. })
        ));
    }
}
