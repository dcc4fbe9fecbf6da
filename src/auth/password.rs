//! SHA-256 password hashing.

use super::PasswordHasher;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 over `salt || password`, compared with `subtle`.
#[derive(Debug, Copy, Clone, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    /// Create a new SHA-256 hasher.
    pub const fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str, salt: &[u8]) -> [u8; 32] {
        let mut digest = Sha256::new();
        digest.update(salt);
        digest.update(password.as_bytes());

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest.finalize());
        hash
    }

    fn verify(&self, password: &str, salt: &[u8], hash: &[u8; 32]) -> bool {
        self.hash(password, salt).ct_eq(hash).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 16] = [1; 16];

    #[test]
    fn test_known_vector() {
        let abc = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
            0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
            0xf2, 0x00, 0x15, 0xad,
        ];
        let hasher = Sha256Hasher::new();
        assert_eq!(hasher.hash("abc", &[]), abc);
        assert_eq!(hasher.hash("bc", b"a"), abc);
    }

    #[test]
    fn test_same_password_same_hash() {
        let hasher = Sha256Hasher::new();
        assert_eq!(hasher.hash("password123", &SALT), hasher.hash("password123", &SALT));
        assert_ne!(hasher.hash("password123", &SALT), hasher.hash("password456", &SALT));
    }

    #[test]
    fn test_different_salts_different_hashes() {
        let hasher = Sha256Hasher::new();
        assert_ne!(hasher.hash("password123", &SALT), hasher.hash("password123", &[2; 16]));
    }

    #[test]
    fn test_verify() {
        let hasher = Sha256Hasher::new();
        let hash = hasher.hash("password", &SALT);

        assert!(hasher.verify("password", &SALT, &hash));
        assert!(!hasher.verify("Password", &SALT, &hash));
        assert!(!hasher.verify("passwore", &SALT, &hash));
        assert!(!hasher.verify("password", &[2; 16], &hash));
    }

    #[test]
    fn test_empty_and_unicode_passwords() {
        let hasher = Sha256Hasher::default();
        let empty = hasher.hash("", &SALT);
        assert!(hasher.verify("", &SALT, &empty));
        assert!(!hasher.verify("nonempty", &SALT, &empty));

        let hash = hasher.hash("blåbærsyltetøy", &SALT);
        assert!(hasher.verify("blåbærsyltetøy", &SALT, &hash));
    }
}
