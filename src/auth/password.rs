use std::fmt;

use argon2::{
    password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{error, warn};

use super::error::AuthError;

/// Argon2 PHC string. Algorithm, parameters and salt travel inside it, so
/// verification needs nothing but the plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_stored(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Hashes and verifies passwords.
///
/// Holds a hash of a random throwaway password so that a login for an
/// unknown user can burn the same verification cost as a real one.
#[derive(Clone)]
pub struct CredentialStore {
    decoy: PasswordHash,
    #[cfg(test)]
    verifications: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl CredentialStore {
    pub fn new() -> Result<Self, AuthError> {
        let throwaway: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Ok(Self {
            decoy: hash_password(&throwaway)?,
            #[cfg(test)]
            verifications: Default::default(),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<PasswordHash, AuthError> {
        hash_password(plain)
    }

    /// A stored value that does not parse is a mismatch, and still pays for
    /// a decoy verification.
    pub fn verify(&self, plain: &str, hash: &PasswordHash) -> bool {
        match PhcString::new(hash.as_str()) {
            Ok(parsed) => self.run_argon2(plain, &parsed),
            Err(e) => {
                warn!(error = %e, "stored password hash does not parse");
                self.verify_decoy(plain)
            }
        }
    }

    /// Runs a full verification against the decoy hash. Always false.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        if let Ok(parsed) = PhcString::new(self.decoy.as_str()) {
            let _ = self.run_argon2(plain, &parsed);
        }
        false
    }

    // Argon2 compares the derived output in constant time.
    fn run_argon2(&self, plain: &str, parsed: &PhcString<'_>) -> bool {
        #[cfg(test)]
        self.verifications
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Argon2::default()
            .verify_password(plain.as_bytes(), parsed)
            .is_ok()
    }

    /// Argon2 verifications run so far, shared across clones.
    #[cfg(test)]
    pub fn verifications(&self) -> usize {
        self.verifications.load(std::sync::atomic::Ordering::SeqCst)
    }
}

fn hash_password(plain: &str) -> Result<PasswordHash, AuthError> {
    if plain.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AuthError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(PasswordHash(hash))
}
