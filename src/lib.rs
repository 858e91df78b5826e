//! pwbox - passphrase-based authenticated encryption
//!
//! Turns a passphrase and a message into a single self-describing container
//! (PBKDF2-HMAC-SHA256 key derivation, ChaCha20-Poly1305 encryption) and
//! back, rejecting wrong passphrases and tampered data.
//!
//! ```no_run
//! let container = pwbox::encrypt(b"Hello, World!", "Strong Passphrase 2025!")?;
//! let plaintext = pwbox::decrypt(&container, "Strong Passphrase 2025!")?;
//! assert_eq!(plaintext, b"Hello, World!");
//! # Ok::<(), pwbox::PwboxError>(())
//! ```

#![forbid(unsafe_code)]

pub mod aead;
pub mod armor;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod random;

pub use envelope::{Container, Envelope, FormatParams, decrypt, encrypt};
pub use error::{ErrorCategory, ErrorKind, PwboxError, Result};
