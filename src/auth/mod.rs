//! Authentication service: signup and login over the credential store.
//!
//! Hashing policy:
//! - Iterated SHA-256 (100k rounds) with a fresh random 16-byte salt
//!   per signup, so identical passwords never produce identical hashes.
//! - The salt is embedded in the stored string as `salt$digest`, which
//!   keeps the user table at a single `password_hash` column.
//! - Verification re-derives the digest and compares in constant time.
//! - A login for an unknown username runs a dummy hash so both failure
//!   paths cost the same, and both report the identical error.

pub mod store;

pub use store::{CredentialStore, StoreError, UserRecord};

use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Salt byte length for password hashing.
const SALT_BYTES: usize = 16;

/// Number of SHA-256 iterations for password stretching.
const HASH_ITERATIONS: u32 = 100_000;

/// Fixed salt used for the dummy hash on unknown-user logins.
const DUMMY_SALT: &str = "00000000000000000000000000000000";

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    UserExists,
    /// Covers both unknown user and wrong password, to prevent
    /// username enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// A signup request that fails input validation.
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUser => AuthError::UserExists,
            other => AuthError::Store(other),
        }
    }
}

/// Signup/login logic over the credential store.
pub struct AuthService {
    store: CredentialStore,
}

impl AuthService {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Register a new user. Returns `UserExists` if the username is
    /// taken — whether caught by the lookup fast path or by the
    /// PRIMARY KEY constraint at insert time.
    pub fn signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidRequest("Username cannot be empty".into()));
        }
        if username.len() > 64 {
            return Err(AuthError::InvalidRequest(
                "Username too long (max 64 characters)".into(),
            ));
        }
        if password.len() < 8 {
            return Err(AuthError::InvalidRequest(
                "Password must be at least 8 characters".into(),
            ));
        }

        // Fast path only; uniqueness is enforced by the store.
        if self.store.find(username)?.is_some() {
            return Err(AuthError::UserExists);
        }

        let hash = hash_password(password, &generate_salt());
        self.store.insert(username, &hash)?;
        Ok(())
    }

    /// Authenticate a user. Unknown username and wrong password are
    /// indistinguishable to the caller.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        match self.store.find(username.trim())? {
            Some(record) => {
                if verify_password(password, &record.password_hash) {
                    Ok(record.username)
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            }
            None => {
                // Dummy hash to prevent a timing side-channel
                let _ = hash_password(password, DUMMY_SALT);
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

// ── Cryptographic helpers ───────────────────────────────────────────

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password with salt using iterated SHA-256.
/// Returns the storable `salt$digest` string.
fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    // Iterated hashing for key stretching
    for _ in 1..HASH_ITERATIONS {
        let mut h = Sha256::new();
        h.update(digest);
        h.update(salt.as_bytes());
        digest = h.finalize();
    }

    format!("{salt}${}", hex::encode(digest))
}

/// Verify a password against a stored `salt$digest` string.
fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, _)) = stored.split_once('$') else {
        return false;
    };
    let attempt = hash_password(password, salt);
    constant_time_eq(attempt.as_bytes(), stored.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_service() -> (TempDir, AuthService) {
        let tmp = TempDir::new().unwrap();
        let store = CredentialStore::open(&tmp.path().join("users.db")).unwrap();
        (tmp, AuthService::new(store))
    }

    #[test]
    fn signup_then_login() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        let username = auth.login("alice", "Secret123").unwrap();
        assert_eq!(username, "alice");
    }

    #[test]
    fn duplicate_signup_fails_second_time() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        let result = auth.signup("alice", "Other456x");
        assert!(matches!(result, Err(AuthError::UserExists)));
    }

    #[test]
    fn login_wrong_password_fails() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        let result = auth.login("alice", "wrongpass");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn unknown_user_and_wrong_password_are_indistinguishable() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        let unknown = auth.login("ghost", "whatever1").unwrap_err();
        let mismatch = auth.login("alice", "whatever1").unwrap_err();
        assert_eq!(unknown.to_string(), mismatch.to_string());
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(mismatch, AuthError::InvalidCredentials));
    }

    #[test]
    fn same_password_hashes_differently_per_signup() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        auth.signup("bob", "Secret123").unwrap();

        let h1 = auth.store().find("alice").unwrap().unwrap().password_hash;
        let h2 = auth.store().find("bob").unwrap().unwrap().password_hash;
        assert_ne!(h1, h2);

        // Both still verify against their own plaintext
        assert!(auth.login("alice", "Secret123").is_ok());
        assert!(auth.login("bob", "Secret123").is_ok());
    }

    #[test]
    fn stored_hash_is_not_the_plaintext() {
        let (_tmp, auth) = test_service();

        auth.signup("alice", "Secret123").unwrap();
        let stored = auth.store().find("alice").unwrap().unwrap().password_hash;
        assert!(!stored.contains("Secret123"));
        assert!(stored.contains('$'));
    }

    #[test]
    fn signup_empty_username_rejected() {
        let (_tmp, auth) = test_service();

        let result = auth.signup("   ", "Secret123");
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
    }

    #[test]
    fn signup_short_password_rejected() {
        let (_tmp, auth) = test_service();

        let result = auth.signup("alice", "short");
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
    }

    #[test]
    fn signup_trims_username() {
        let (_tmp, auth) = test_service();

        auth.signup("  alice  ", "Secret123").unwrap();
        assert!(auth.login("alice", "Secret123").is_ok());
    }

    #[test]
    fn hash_is_deterministic_with_same_salt() {
        let h1 = hash_password("test_password", "fixed_salt_value");
        let h2 = hash_password("test_password", "fixed_salt_value");
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_differs_with_different_salt() {
        let h1 = hash_password("test_password", "salt_a");
        let h2 = hash_password("test_password", "salt_b");
        assert_ne!(h1, h2);
    }

    #[test]
    fn verify_rejects_malformed_stored_value() {
        assert!(!verify_password("anything", "no-separator-here"));
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
