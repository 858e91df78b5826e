use std::error::Error as StdError;

use thiserror::Error;

/// Broad classification of a failure.
///
/// The envelope layer (`encrypt`/`decrypt` and everything beneath them) only
/// ever produces `Configuration`, `Format` or `Authentication`. `Io` is
/// reserved for the outer surfaces that touch files and terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Invalid cryptographic parameters. This is a programmer error and
    /// should be treated as fatal; it is never corrected silently.
    Configuration,

    /// The input is not a well-formed container (or armored container).
    /// Safe to report to the user as "invalid data".
    Format,

    /// The container failed authentication: wrong passphrase, tampering,
    /// or corruption. Deliberately indistinguishable from one another.
    Authentication,

    /// Interaction with the filesystem, stdin/stdout or the terminal failed.
    Io,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Salt shorter than the KDF minimum.
    SaltTooShort,
    /// KDF iteration count below the floor.
    IterationsTooLow,
    /// Salt length does not match the container format.
    SaltLength,
    /// Key length does not match what the cipher requires.
    KeyLength,
    /// Nonce length does not match what the cipher requires.
    NonceLength,
    /// Tag length does not match what the cipher produces.
    TagLength,
    /// The container does not start with the format magic.
    BadMagic,
    /// The container carries a version this build does not support.
    UnsupportedVersion,
    /// Input ended before all fixed-size fields could be read.
    Truncated,
    /// The armored representation is malformed or unrelated to pwbox.
    ArmorInvalid,
    /// Base64 decoding of the armored payload failed.
    ArmorDecode,
    /// Input claims to be armored pwbox data of a future/unsupported version.
    ArmorFromFuture,
    /// Wrong passphrase, tampered data or corruption.
    AuthenticationFailed,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Filesystem or stream I/O failed.
    Io,
}

/// Message carried by every authentication failure. There is exactly one so
/// that callers cannot tell a wrong passphrase apart from tampered data.
pub(crate) const AUTHENTICATION_FAILED_MSG: &str =
    "corrupt input, tampered-with data, or bad passphrase";

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct PwboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl PwboxError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The single opaque authentication failure.
    ///
    /// Never attaches a source: the underlying cipher error would reveal
    /// which check failed.
    pub fn authentication() -> Self {
        Self::with_kind(
            ErrorCategory::Authentication,
            ErrorKind::AuthenticationFailed,
            AUTHENTICATION_FAILED_MSG,
        )
    }

    pub(crate) fn configuration(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::Configuration, kind, msg)
    }

    pub(crate) fn format(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::Format, kind, msg)
    }

    pub(crate) fn io(msg: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_kind_and_source(ErrorCategory::Io, ErrorKind::Io, msg, source)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving
    /// category, kind, and the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// The full chain as "outer: inner: innermost", like anyhow's `{:#}`.
    pub fn render_chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = StdError::source(self);
        while let Some(s) = source {
            out.push_str(": ");
            out.push_str(&s.to_string());
            source = s.source();
        }
        out
    }

    pub fn is_authentication(&self) -> bool {
        self.category == ErrorCategory::Authentication
    }

    pub fn is_format(&self) -> bool {
        self.category == ErrorCategory::Format
    }

    pub fn is_configuration(&self) -> bool {
        self.category == ErrorCategory::Configuration
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PwboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_error_is_opaque() {
        let err = PwboxError::authentication();
        assert_eq!(err.category, ErrorCategory::Authentication);
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(err.to_string(), AUTHENTICATION_FAILED_MSG);
        assert!(err.source_error().is_none());
    }

    #[test]
    fn test_context_preserves_category_and_kind() {
        let err = PwboxError::format(ErrorKind::BadMagic, "not a pwbox container")
            .with_context("failed to decrypt");

        assert_eq!(err.category, ErrorCategory::Format);
        assert_eq!(err.kind, Some(ErrorKind::BadMagic));
        assert_eq!(err.message(), "failed to decrypt");
        assert_eq!(
            err.source_error().map(|s| s.to_string()).as_deref(),
            Some("not a pwbox container")
        );
        assert_eq!(err.render_chain(), "failed to decrypt: not a pwbox container");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PwboxError::io("failed to read from x", io);
        assert_eq!(err.category, ErrorCategory::Io);
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert!(err.source_error().is_some());
        assert_eq!(err.render_chain(), "failed to read from x: gone");
    }

    #[test]
    fn test_render_chain_without_source() {
        assert_eq!(
            PwboxError::authentication().render_chain(),
            AUTHENTICATION_FAILED_MSG
        );
    }
}
