//! Challenge-response password hashing for local accounts.
//!
//! The server hands out a per-user `salt`, a per-login `rnd` challenge and an
//! optional PBKDF2 round count. The hash sent on login is
//! `md5(rnd + inner)` where `inner` is the hex of `md5(salt + password)`,
//! optionally stretched through PBKDF2-HMAC-SHA256 first.

use md5::{Digest, Md5};
use sha2::Sha256;

const PBKDF2_OUTPUT_LEN: usize = 32;

/// Compute the login hash for the given salt challenge.
#[must_use]
pub fn password_hash(salt: &str, rnd: &str, password: &str, pbkdf2_rounds: u32) -> String {
    let mut hasher = Md5::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let salted = hasher.finalize();

    let inner = if pbkdf2_rounds > 0 {
        let mut stretched = [0_u8; PBKDF2_OUTPUT_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(&salted, salt.as_bytes(), pbkdf2_rounds, &mut stretched);
        hex::encode(stretched)
    } else {
        hex::encode(salted)
    };

    let mut hasher = Md5::new();
    hasher.update(rnd.as_bytes());
    hasher.update(inner.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_without_stretching() {
        assert_eq!(
            password_hash("abc", "rnd123", "secret", 0),
            "39648f90a3afbf4dccdcdebf4c271957"
        );
    }

    #[test]
    fn hash_with_pbkdf2_rounds() {
        assert_eq!(
            password_hash("abc", "rnd123", "secret", 10_000),
            "6bcd5535fd617316ca2617bffc2178e1"
        );
        assert_eq!(
            password_hash("s4lt", "r4nd", "admin", 1_000),
            "7a87147a1bbdf8c5b5a071b523bf6689"
        );
    }

    #[test]
    fn challenge_changes_the_hash() {
        assert_ne!(
            password_hash("abc", "one", "secret", 0),
            password_hash("abc", "two", "secret", 0)
        );
    }
}
