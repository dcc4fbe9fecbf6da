//! Password checking for login fields.
//!
//! The session layer knows nothing about users; a field validator or a
//! login command asks a [`CredentialTable`] whether the username and
//! password fields it was given belong together, then grants modes.
//!
//! ```rust,ignore
//! static USERS: CredentialTable<Sha256Hasher, 1> = CredentialTable::new(
//!     [Credential::new("admin", Mode::Enabled.mask(), SALT, HASH)],
//!     Sha256Hasher::new(),
//! );
//!
//! fn check(peer: &mut Peer<'_, Conn>, _id: u32, password: &str) -> bool {
//!     let user = peer.field(Field::Username.bit()).unwrap_or("");
//!     match USERS.verify(user, password) {
//!         Some(cred) => { peer.set_mode(cred.modes); true }
//!         None => false,
//!     }
//! }
//! ```

use log::debug;
use subtle::{Choice, ConstantTimeEq};

pub mod password;

pub use password::Sha256Hasher;

/// Salted password hash.
pub trait PasswordHasher {
    /// Hash `password` with `salt`.
    fn hash(&self, password: &str, salt: &[u8]) -> [u8; 32];

    /// Check `password` against a stored hash in constant time.
    fn verify(&self, password: &str, salt: &[u8], hash: &[u8; 32]) -> bool;
}

/// One user allowed to log in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Login name
    pub username: &'static str,

    /// Modes granted on success
    pub modes: u32,

    /// Per-user salt
    pub salt: [u8; 16],

    /// `hash(password, salt)`
    pub hash: [u8; 32],
}

impl Credential {
    /// Credential from a precomputed hash.
    pub const fn new(username: &'static str, modes: u32, salt: [u8; 16], hash: [u8; 32]) -> Self {
        Self {
            username,
            modes,
            salt,
            hash,
        }
    }

    /// Credential hashing a plaintext password now.
    pub fn hashed<H: PasswordHasher>(
        hasher: &H,
        username: &'static str,
        modes: u32,
        salt: [u8; 16],
        password: &str,
    ) -> Self {
        Self::new(username, modes, salt, hasher.hash(password, &salt))
    }
}

/// Fixed table of credentials.
#[derive(Debug)]
pub struct CredentialTable<H: PasswordHasher, const N: usize> {
    credentials: [Credential; N],
    hasher: H,
}

impl<H: PasswordHasher, const N: usize> CredentialTable<H, N> {
    /// Create a table. Hashes must have been made with `hasher`.
    pub const fn new(credentials: [Credential; N], hasher: H) -> Self {
        Self {
            credentials,
            hasher,
        }
    }

    /// Credential for `username`, if any.
    pub fn find(&self, username: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.username == username)
    }

    /// Check a username and password pair.
    ///
    /// Every entry is hashed and compared whatever the username, so the
    /// time taken does not reveal whether the user exists.
    pub fn verify(&self, username: &str, password: &str) -> Option<&Credential> {
        let mut found = None;

        for (i, cred) in self.credentials.iter().enumerate() {
            let name: Choice = cred.username.as_bytes().ct_eq(username.as_bytes());
            let secret = Choice::from(u8::from(self.hasher.verify(password, &cred.salt, &cred.hash)));

            if bool::from(name & secret) && found.is_none() {
                found = Some(i);
            }
        }

        debug!("login {:?}: {}", username, if found.is_some() { "ok" } else { "denied" });
        found.map(|i| &self.credentials[i])
    }

    /// Number of credentials.
    pub fn len(&self) -> usize {
        N
    }

    /// True for a table without credentials.
    pub fn is_empty(&self) -> bool {
        N == 0
    }
}
