//! Self-describing passphrase-encrypted container
//!
//! The version 1 binary format is:
//! - magic: 4 bytes, `PWBX`
//! - version: 1 byte, `0x01`
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - ciphertext: exactly as long as the plaintext
//! - tag: 16 bytes (Poly1305)
//!
//! The key is PBKDF2-HMAC-SHA256 over the passphrase and salt with 600 000
//! iterations, and the cipher is ChaCha20-Poly1305. The 5 header bytes are
//! authenticated as associated data.
//!
//! Decoding is fail-fast: the first structural violation rejects the input
//! before any key derivation happens.

use tracing::debug;

use crate::aead::{self, AeadCipher};
use crate::error::{ErrorKind, PwboxError, Result};
use crate::kdf;
use crate::random;

/// Magic bytes at the start of every container
pub const MAGIC: [u8; 4] = *b"PWBX";

/// Length of the magic marker
pub const MAGIC_LEN: usize = MAGIC.len();

/// Magic plus the version byte
pub const HEADER_LEN: usize = MAGIC_LEN + 1;

/// Largest salt a container format may declare
pub const MAX_SALT_LEN: usize = 64;

/// Cryptographic parameters of one container version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatParams {
    pub version: u8,
    pub salt_len: usize,
    pub nonce_len: usize,
    pub tag_len: usize,
    pub key_len: usize,
    pub iterations: u32,
}

impl FormatParams {
    /// The current format.
    pub const V1: FormatParams = FormatParams {
        version: 1,
        salt_len: 16,
        nonce_len: aead::NONCE_LEN,
        tag_len: aead::TAG_LEN,
        key_len: aead::KEY_LEN,
        iterations: 600_000,
    };

    /// Every version this build can decode. A format bump adds an entry here.
    const SUPPORTED: &'static [FormatParams] = &[FormatParams::V1];

    /// Looks up the parameters for a container version.
    pub fn for_version(version: u8) -> Option<FormatParams> {
        Self::SUPPORTED
            .iter()
            .find(|p| p.version == version)
            .copied()
    }

    /// Bytes a container adds on top of the plaintext.
    pub const fn overhead(&self) -> usize {
        HEADER_LEN + self.salt_len + self.nonce_len + self.tag_len
    }

    /// Exact container length for a plaintext of `plaintext_len` bytes.
    pub const fn container_len(&self, plaintext_len: usize) -> usize {
        self.overhead() + plaintext_len
    }

    /// Checks the parameters against the KDF floors and the cipher's sizes.
    pub fn validate(&self) -> Result<()> {
        if self.salt_len < kdf::MIN_SALT_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::SaltTooShort,
                format!(
                    "salt must be at least {} bytes, got {}",
                    kdf::MIN_SALT_LEN,
                    self.salt_len
                ),
            ));
        }
        if self.salt_len > MAX_SALT_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::SaltLength,
                format!(
                    "salt must be at most {} bytes, got {}",
                    MAX_SALT_LEN, self.salt_len
                ),
            ));
        }
        if self.iterations < kdf::MIN_ITERATIONS {
            return Err(PwboxError::configuration(
                ErrorKind::IterationsTooLow,
                format!(
                    "kdf iterations must be at least {}, got {}",
                    kdf::MIN_ITERATIONS,
                    self.iterations
                ),
            ));
        }
        if self.key_len != aead::KEY_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::KeyLength,
                format!("key must be {} bytes, got {}", aead::KEY_LEN, self.key_len),
            ));
        }
        if self.nonce_len != aead::NONCE_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::NonceLength,
                format!(
                    "nonce must be {} bytes, got {}",
                    aead::NONCE_LEN,
                    self.nonce_len
                ),
            ));
        }
        if self.tag_len != aead::TAG_LEN {
            return Err(PwboxError::configuration(
                ErrorKind::TagLength,
                format!("tag must be {} bytes, got {}", aead::TAG_LEN, self.tag_len),
            ));
        }
        Ok(())
    }
}

impl Default for FormatParams {
    fn default() -> Self {
        Self::V1
    }
}

/// A structurally valid container, borrowed from the input bytes.
///
/// Nothing here has been authenticated yet.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub params: FormatParams,
    pub header: &'a [u8],
    pub salt: &'a [u8],
    pub nonce: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
}

impl Container<'_> {
    pub fn version(&self) -> u8 {
        self.params.version
    }

    /// Length of the plaintext this container decrypts to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Encoder/decoder for containers. Stateless between calls and safe to
/// share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    params: FormatParams,
}

impl Envelope {
    /// Creates a codec that seals with `params`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `params` fails [`FormatParams::validate`].
    pub fn new(params: FormatParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &FormatParams {
        &self.params
    }

    /// Encrypt `plaintext` under `passphrase` with a fresh random salt and nonce.
    pub fn seal(&self, passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let salt = random::bytes(self.params.salt_len);
        let nonce = random::bytes(self.params.nonce_len);
        self.seal_with(passphrase, plaintext, &salt, &nonce)
    }

    /// Encrypt with caller-provided salt and nonce.
    ///
    /// This exists to produce reproducible test vectors. Reusing a salt and
    /// nonce pair under the same passphrase destroys confidentiality; always
    /// use [`Envelope::seal`] otherwise.
    pub fn seal_with(
        &self,
        passphrase: &[u8],
        plaintext: &[u8],
        salt: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>> {
        let params = &self.params;
        if salt.len() != params.salt_len {
            return Err(PwboxError::configuration(
                ErrorKind::SaltLength,
                format!(
                    "salt must be exactly {} bytes, got {}",
                    params.salt_len,
                    salt.len()
                ),
            ));
        }
        if nonce.len() != params.nonce_len {
            return Err(PwboxError::configuration(
                ErrorKind::NonceLength,
                format!(
                    "nonce must be exactly {} bytes, got {}",
                    params.nonce_len,
                    nonce.len()
                ),
            ));
        }

        let mut output = Vec::with_capacity(params.container_len(plaintext.len()));
        output.extend_from_slice(&MAGIC);
        output.push(params.version);
        output.extend_from_slice(salt);
        output.extend_from_slice(nonce);

        let key = kdf::derive(passphrase, salt, params.iterations, params.key_len)?;
        let cipher = AeadCipher::new(&key)?;
        let (ciphertext, tag) = cipher.seal(nonce, plaintext, &output[..HEADER_LEN])?;
        output.extend_from_slice(&ciphertext);
        output.extend_from_slice(&tag);

        debug_assert_eq!(output.len(), params.container_len(plaintext.len()));
        debug!(
            version = params.version,
            plaintext_len = plaintext.len(),
            container_len = output.len(),
            "sealed envelope"
        );

        Ok(output)
    }

    /// Validate, authenticate and decrypt a container.
    ///
    /// # Errors
    ///
    /// A format error for structurally invalid input, otherwise a single
    /// opaque authentication error for a wrong passphrase or any tampering.
    pub fn open(&self, passphrase: &[u8], container: &[u8]) -> Result<Vec<u8>> {
        let parsed = self.parse(container)?;
        let params = parsed.params;

        let key = kdf::derive(passphrase, parsed.salt, params.iterations, params.key_len)?;
        let cipher = AeadCipher::new(&key)?;
        let plaintext = cipher
            .open(parsed.nonce, parsed.ciphertext, parsed.tag, parsed.header)
            .inspect_err(|_| debug!(version = params.version, "envelope failed authentication"))?;

        debug!(
            version = params.version,
            plaintext_len = plaintext.len(),
            "opened envelope"
        );

        Ok(plaintext)
    }

    /// Structural validation of a container without any key derivation.
    pub fn parse<'a>(&self, container: &'a [u8]) -> Result<Container<'a>> {
        if container.len() < self.min_container_len() {
            return Err(reject(
                ErrorKind::Truncated,
                "input likely truncated; shorter than the smallest container",
            ));
        }

        let (header, body) = container.split_at(HEADER_LEN);
        if header[..MAGIC_LEN] != MAGIC {
            return Err(reject(
                ErrorKind::BadMagic,
                "input unrecognized as pwbox data",
            ));
        }

        let version = header[MAGIC_LEN];
        let params = self.params_for(version).ok_or_else(|| {
            reject(
                ErrorKind::UnsupportedVersion,
                format!("unsupported container version {}", version),
            )
        })?;

        if container.len() < params.overhead() {
            return Err(reject(
                ErrorKind::Truncated,
                format!("input likely truncated; version {} container", version),
            ));
        }

        let (salt, rest) = body.split_at(params.salt_len);
        let (nonce, rest) = rest.split_at(params.nonce_len);
        let (ciphertext, tag) = rest.split_at(rest.len() - params.tag_len);

        Ok(Container {
            params,
            header,
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }

    /// The codec's own parameters win for its own version so that a codec
    /// built with custom parameters can read what it writes.
    fn params_for(&self, version: u8) -> Option<FormatParams> {
        if version == self.params.version {
            Some(self.params)
        } else {
            FormatParams::for_version(version)
        }
    }

    fn min_container_len(&self) -> usize {
        FormatParams::SUPPORTED
            .iter()
            .map(FormatParams::overhead)
            .fold(self.params.overhead(), usize::min)
    }
}

fn reject(kind: ErrorKind, msg: impl Into<String>) -> PwboxError {
    let err = PwboxError::format(kind, msg);
    debug!(?kind, reason = err.message(), "rejected container");
    err
}

/// Encrypt `plaintext` into a version 1 container.
pub fn encrypt(plaintext: &[u8], passphrase: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Envelope::default().seal(passphrase.as_ref(), plaintext)
}

/// Decrypt a container produced by [`encrypt`].
pub fn decrypt(container: &[u8], passphrase: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Envelope::default().open(passphrase.as_ref(), container)
}
