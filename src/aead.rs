//! Authenticated encryption with ChaCha20-Poly1305 (RFC 8439)
//!
//! Ciphertext and tag are kept detached so the container can lay them out
//! as separate fields. Ciphertext length always equals plaintext length.
//!
//! Every failure to open is reported as the same opaque authentication
//! error, whether the key is wrong, the tag does not verify, or the nonce or
//! tag has the wrong length.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce, Tag};

use crate::error::{ErrorCategory, ErrorKind, PwboxError, Result};
use crate::kdf::DerivedKey;

/// Key length in bytes
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes
pub const TAG_LEN: usize = 16;

pub struct AeadCipher {
    cipher: ChaCha20Poly1305,
}

impl AeadCipher {
    /// Build a cipher around a derived key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is not exactly [`KEY_LEN`] bytes.
    pub fn new(key: &DerivedKey) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::KeyLength,
                format!("cipher key must be {} bytes, got {}", KEY_LEN, key.len()),
            ));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| {
            PwboxError::configuration(ErrorKind::KeyLength, "cipher rejected key length")
        })?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`, authenticating `associated_data` alongside it.
    ///
    /// Returns the ciphertext (same length as the plaintext) and the tag.
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        if nonce.len() != NONCE_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::NonceLength,
                format!("nonce must be {} bytes, got {}", NONCE_LEN, nonce.len()),
            ));
        }

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), associated_data, &mut buffer)
            // Only reachable for plaintexts beyond the cipher's 256 GiB limit.
            .map_err(|_| PwboxError::new(ErrorCategory::Configuration, "encryption failed"))?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    /// Verify and decrypt. Either returns the exact original plaintext or
    /// fails with [`PwboxError::authentication`].
    pub fn open(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>> {
        if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(PwboxError::authentication());
        }

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                associated_data,
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| PwboxError::authentication())?;
        Ok(buffer)
    }
}
