//! Password validation and hashing for the bookkeeper account.

use std::fmt::Debug;

use bcrypt::{DEFAULT_COST, hash, verify};
use zxcvbn::{Score, zxcvbn};

use crate::Error;

/// The minimum score a password must reach to be accepted.
///
/// Score three corresponds to a password that is safely unguessable with
/// fewer than 10^10 guesses.
const MINIMUM_PASSWORD_SCORE: Score = Score::Three;

/// A password that has been checked for strength, but not yet hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create a validated password from a raw password string.
    ///
    /// # Errors
    /// Returns [Error::TooWeak] if the password is too easy to guess. The
    /// error string contains feedback that can be shown to the user.
    pub fn new(raw_password: &str) -> Result<Self, Error> {
        let entropy = zxcvbn(raw_password, &[]);

        if entropy.score() < MINIMUM_PASSWORD_SCORE {
            let feedback = entropy
                .feedback()
                .and_then(|feedback| feedback.warning())
                .map(|warning| warning.to_string())
                .unwrap_or_else(|| "try a longer password with more variety".to_owned());

            return Err(Error::TooWeak(feedback));
        }

        Ok(Self(raw_password.to_owned()))
    }

    /// Create a `ValidatedPassword` without checking its strength.
    ///
    /// This should only be used in tests.
    #[cfg(test)]
    pub fn new_unchecked(raw_password: &str) -> Self {
        Self(raw_password.to_owned())
    }
}

// Manual impl so that raw passwords do not end up in logs.
impl Debug for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValidatedPassword(********)")
    }
}

/// A password hash created with bcrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a validated password.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if the underlying hashing library fails.
    pub fn new(password: ValidatedPassword) -> Result<Self, Error> {
        hash(&password.0, DEFAULT_COST)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Create a `PasswordHash` from a hash string that came out of a trusted
    /// source such as the application's database.
    pub fn new_unchecked(password_hash: &str) -> Self {
        Self(password_hash.to_owned())
    }

    /// Check that `raw_password` matches the stored password.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if the underlying hashing library fails.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}


#[cfg(test)]
mod password_hash_tests {
    use super::{PasswordHash, ValidatedPassword};

    #[test]
    fn hash_password_produces_verifiable_hash() {
        let password = ValidatedPassword::new_unchecked("okon");
        let hash = PasswordHash::new(password).unwrap();

        assert!(hash.verify("okon").unwrap());
        assert!(!hash.verify("thewrongpassword").unwrap());
    }

    #[test]
    fn hash_duplicate_password_produces_unique_hash() {
        let password = ValidatedPassword::new_unchecked("okon");
        let hash = PasswordHash::new(password.clone()).unwrap();
        let dupe_hash = PasswordHash::new(password).unwrap();

        assert_ne!(hash, dupe_hash);
    }

    #[test]
    fn verify_password_succeeds_for_stored_hash() {
        let hash = PasswordHash::new_unchecked(
            "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm",
        );

        assert!(hash.verify("okon").unwrap());
    }
}
