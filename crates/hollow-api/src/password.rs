//! Password hashing and verification using Argon2id.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so the
//! salt and cost travel with the hash and verification always uses the cost
//! the digest was made with.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Invalid password hash format")]
    InvalidHash,

    #[error("Invalid hasher parameters: {0}")]
    Params(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Time cost (passes over memory)
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted, deliberately slow one-way hasher for credentials.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    // Digest of a random password at the configured cost, for accounts that do not exist.
    decoy: String,
}

impl CredentialHasher {
    pub fn new(config: &HasherConfig) -> Result<Self, HashingError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| HashingError::Params(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_password = SaltString::generate(&mut OsRng);
        let decoy = hash_with(&argon2, decoy_password.as_str())?;

        Ok(Self { argon2, decoy })
    }

    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        hash_with(&self.argon2, password)
    }

    /// `Ok(false)` on mismatch; `Err` only when the digest is unusable or the
    /// computation itself fails.
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, HashingError> {
        let parsed = PasswordHash::new(digest).map_err(|_| HashingError::InvalidHash)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashingError::Hash(e.to_string())),
        }
    }

    /// Spend a full verification on a password that has no account behind
    /// it, so the unknown-account path takes as long as a real check.
    /// Never matches.
    pub fn verify_decoy(&self, password: &str) -> Result<bool, HashingError> {
        self.verify(password, &self.decoy).map(|_| false)
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| HashingError::Hash(e.to_string()))?;
    Ok(digest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let digest = hasher.hash("secret1").unwrap();

        assert!(hasher.verify("secret1", &digest).unwrap());
        assert!(!hasher.verify("secret2", &digest).unwrap());
    }

    #[test]
    fn test_digest_is_salted() {
        let hasher = fast_hasher();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("same-password", &a).unwrap());
        assert!(hasher.verify("same-password", &b).unwrap());
    }

    #[test]
    fn test_digest_carries_cost() {
        let digest = fast_hasher().hash("secret1").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(digest.contains("m=256"));
        assert!(digest.contains("t=1"));
    }

    #[test]
    fn test_verify_uses_digest_cost() {
        // A hasher with different cost still verifies older digests.
        let digest = fast_hasher().hash("secret1").unwrap();
        let other = CredentialHasher::new(&HasherConfig {
            memory_kib: 512,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        assert!(other.verify("secret1", &digest).unwrap());
    }

    #[test]
    fn test_decoy_never_matches() {
        let hasher = fast_hasher();
        assert!(!hasher.verify_decoy("secret1").unwrap());
        assert!(!hasher.verify_decoy("").unwrap());
        assert!(hasher.decoy.contains("m=256"));
    }

    #[test]
    fn test_invalid_digest() {
        let result = fast_hasher().verify("secret1", "not-a-phc-string");
        assert!(matches!(result, Err(HashingError::InvalidHash)));
    }

    #[test]
    fn test_invalid_params() {
        let result = CredentialHasher::new(&HasherConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(HashingError::Params(_))));
    }
}
