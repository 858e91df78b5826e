//! Passphrase key derivation using PBKDF2-HMAC-SHA256
//!
//! Derivation is deterministic in (passphrase, salt, iterations, output
//! length) so that decryption can re-derive the key from the salt stored in
//! the container. The iteration cost is the whole point: it must not be
//! lowered below [`MIN_ITERATIONS`].

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::{ErrorKind, PwboxError, Result};

/// Minimum salt length in bytes
pub const MIN_SALT_LEN: usize = 16;

/// Minimum number of PBKDF2 iterations
pub const MIN_ITERATIONS: u32 = 100_000;

/// Symmetric key material derived from a passphrase.
///
/// Wiped from memory when dropped. Deliberately not `Clone` and without a
/// `Debug` that would print the bytes.
pub struct DerivedKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        }
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Derive `output_len` bytes of key material from a passphrase and salt.
///
/// An empty passphrase is accepted; rejecting it is a caller policy.
///
/// # Errors
///
/// Returns a configuration error if the salt is shorter than
/// [`MIN_SALT_LEN`], `iterations` is below [`MIN_ITERATIONS`], or
/// `output_len` is zero.
pub fn derive(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(PwboxError::configuration(
            ErrorKind::SaltTooShort,
            format!(
                "salt must be at least {} bytes, got {}",
                MIN_SALT_LEN,
                salt.len()
            ),
        ));
    }
    if iterations < MIN_ITERATIONS {
        return Err(PwboxError::configuration(
            ErrorKind::IterationsTooLow,
            format!(
                "kdf iterations must be at least {}, got {}",
                MIN_ITERATIONS, iterations
            ),
        ));
    }
    if output_len == 0 {
        return Err(PwboxError::configuration(
            ErrorKind::KeyLength,
            "requested key length must be non-zero",
        ));
    }

    trace!(iterations, output_len, "deriving key");

    let mut bytes = Zeroizing::new(vec![0u8; output_len]);
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut bytes);

    Ok(DerivedKey { bytes })
}
