//! # Credential Service
//!
//! One-way hashing of user secrets, keyed with the process-wide secret key.
//!
//! ## Digest Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  secret key ──┬──► UUID v5 ──► salt (16 bytes, fixed per key)          │
//! │               │                                                         │
//! │               └──► Argon2id "secret" parameter (pepper)                │
//! │                                                                         │
//! │  password ──► Argon2id(salt, pepper, cost) ──► $argon2id$v=19$...      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The salt is derived from the key, so the same password always hashes to
//! the same digest under the same key. Verification parses the PHC string
//! and recomputes, so digests made under an older cost still verify.

use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory size in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        HashingCost {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingCost {
    /// Minimal cost, for in-memory databases and tests.
    pub const fn light() -> Self {
        HashingCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies secrets.
///
/// ## Usage
/// ```rust
/// use agora_core::{CredentialService, HashingCost};
///
/// let credentials = CredentialService::new("server-secret", HashingCost::light()).unwrap();
/// let digest = credentials.hash("hunter22").unwrap();
///
/// assert!(credentials.verify("hunter22", &digest));
/// assert!(!credentials.verify("hunter23", &digest));
/// ```
#[derive(Clone)]
pub struct CredentialService {
    secret_key: Vec<u8>,
    salt: SaltString,
    params: Params,
}

impl CredentialService {
    /// Creates a service keyed with `secret_key`.
    pub fn new(secret_key: impl AsRef<[u8]>, cost: HashingCost) -> CoreResult<Self> {
        let secret_key = secret_key.as_ref().to_vec();

        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| CoreError::Credential(e.to_string()))?;

        let salt_bytes = Uuid::new_v5(&Uuid::NAMESPACE_OID, &secret_key).into_bytes();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| CoreError::Credential(e.to_string()))?;

        Ok(CredentialService {
            secret_key,
            salt,
            params,
        })
    }

    fn argon2(&self) -> CoreResult<Argon2<'_>> {
        Argon2::new_with_secret(
            &self.secret_key,
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| CoreError::Credential(e.to_string()))
    }

    /// Derives the digest of `secret`.
    ///
    /// Deterministic: the same secret under the same key and cost always
    /// yields the same PHC string.
    pub fn hash(&self, secret: &str) -> CoreResult<String> {
        let digest = self
            .argon2()?
            .hash_password(secret.as_bytes(), &self.salt)
            .map_err(|e| CoreError::Credential(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Checks `secret` against a digest produced by [`hash`](Self::hash).
    ///
    /// A malformed digest never verifies.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored digest is not a valid PHC string");
                return false;
            }
        };

        match self.argon2() {
            Ok(argon2) => argon2.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                warn!(error = %e, "Credential hasher unavailable");
                false
            }
        }
    }
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("secret_key", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn service(key: &str) -> CredentialService {
        CredentialService::new(key, HashingCost::light()).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let credentials = service("secret");
        let a = credentials.hash("password1").unwrap();
        let b = credentials.hash("password1").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_depends_on_secret_key() {
        let a = service("first-key").hash("password1").unwrap();
        let b = service("second-key").hash("password1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify() {
        let credentials = service("secret");
        let digest = credentials.hash("password1").unwrap();

        assert!(credentials.verify("password1", &digest));
        assert!(!credentials.verify("password2", &digest));
    }

    #[test]
    fn test_verify_rejects_digest_from_other_key() {
        let digest = service("first-key").hash("password1").unwrap();
        assert!(!service("second-key").verify("password1", &digest));
    }

    #[test]
    fn test_verify_rejects_malformed_digest() {
        assert!(!service("secret").verify("password1", "not-a-digest"));
        assert!(!service("secret").verify("password1", ""));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", service("top-secret"));
        assert!(!rendered.contains("top-secret"));
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        let cost = HashingCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            CredentialService::new("secret", cost),
            Err(CoreError::Credential(_))
        ));
    }
}
