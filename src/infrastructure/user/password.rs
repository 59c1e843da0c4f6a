//! Credential digests for stored accounts

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Turns a plaintext credential into a stored digest and checks candidates
/// against it. Stores only ever persist the digest.
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// `false` for a mismatch and for anything that is not a PHC-format digest
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id with the crate's default cost parameters and a fresh random salt
/// per digest
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        let digest = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("Credential digest failed: {}", e)))?;

        Ok(digest.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|digest| {
            Argon2::default()
                .verify_password(password.as_bytes(), &digest)
                .is_ok()
        })
    }
}
