//! Password value object.
//!
//! Wraps an Argon2 PHC hash. Plain text never leaves this module except as
//! an argument to `new` or `verify`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

use crate::config::MIN_PASSWORD_LENGTH;
use crate::errors::{AppError, AppResult};

/// Hash verified when the account does not exist, so a login attempt for
/// an unknown email costs the same as one for a known email.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dummy-password-for-timing", &salt)
        .ok()
        .map(|h| h.to_string())
});

/// Salted one-way password hash
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a new plain-text password.
    ///
    /// # Errors
    /// Validation error if the password is shorter than the minimum length.
    pub fn new(plain_text: &str) -> AppResult<Self> {
        Self::check_policy(plain_text)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;

        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Minimum length counted in characters, not bytes.
    pub fn check_policy(plain_text: &str) -> AppResult<()> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH as usize {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Verify plain text against this hash. A malformed stored hash never
    /// verifies.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }

    /// Burn one verification against a throwaway hash. Always false.
    pub fn verify_dummy(plain_text: &str) -> bool {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = Password::from_hash(hash).verify(plain_text);
        }
        false
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let password = Password::new("Oolong-2024!").unwrap();

        assert!(password.verify("Oolong-2024!"));
        assert!(!password.verify("oolong-2024!"));
    }

    #[test]
    fn restored_hash_still_verifies() {
        let hash = Password::new("Sencha-Fields").unwrap().into_string();
        assert!(Password::from_hash(hash).verify("Sencha-Fields"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = Password::new("Darjeeling1").unwrap();
        let b = Password::new("Darjeeling1").unwrap();

        assert_ne!(a.as_str(), b.as_str());
        assert!(a.verify("Darjeeling1"));
        assert!(b.verify("Darjeeling1"));
    }

    #[test]
    fn length_policy() {
        assert!(Password::new("short").is_err());
        assert!(Password::new("12345678").is_ok());
    }

    #[test]
    fn malformed_hash_and_dummy_never_verify() {
        assert!(!Password::from_hash("not-a-phc-string").verify("anything"));
        assert!(!Password::verify_dummy("anything"));
    }

    #[test]
    fn debug_is_redacted() {
        let password = Password::new("Assam-Breakfast").unwrap();
        assert!(!format!("{:?}", password).contains("argon2"));
    }
}
