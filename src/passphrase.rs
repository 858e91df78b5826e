//! Passphrase sources
//!
//! Every reader hands out the passphrase wrapped in `Zeroizing` so it is
//! wiped when the caller drops it.

use std::io::{self, IsTerminal, Read, Write};

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, PwboxError, Result};

pub trait PassphraseReader {
    /// Read a passphrase as arbitrary bytes (not necessarily UTF-8).
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed passphrase (for testing and embedding)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads the entire stream as the passphrase, byte for byte.
///
/// No newline stripping: `printf 'pw' | pwbox --passphrase-stdin` and
/// `echo pw | ...` are different passphrases.
pub struct StreamPassphraseReader<R> {
    stream: R,
}

impl<R: Read> StreamPassphraseReader<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }
}

impl<R: Read> PassphraseReader for StreamPassphraseReader<R> {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.stream
            .read_to_end(&mut data)
            .map_err(|e| PwboxError::io(format!("error reading passphrase: {}", e), e))?;
        debug!(len = data.len(), "read passphrase from stream");
        Ok(data)
    }
}

/// Prompts on stderr and reads from the terminal without echo.
///
/// Terminal input is limited to UTF-8 by rpassword; non-UTF-8 passphrases
/// must come through [`StreamPassphraseReader`].
#[derive(Debug, Default)]
pub struct TerminalPassphraseReader {
    confirm: bool,
}

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask twice and fail if the entries differ. Used when encrypting,
    /// where a typo would lock the data away for good.
    pub fn confirming() -> Self {
        Self { confirm: true }
    }

    fn prompt(msg: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut stderr = io::stderr();
        stderr
            .write_all(msg.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| PwboxError::io(format!("failed to write prompt: {}", e), e))?;

        // rpassword returns a plain String; move it into Zeroizing right away.
        let passphrase = rpassword::read_password().map_err(|e| {
            PwboxError::with_kind_and_source(
                ErrorCategory::Io,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(PwboxError::with_kind(
                ErrorCategory::Io,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let passphrase = Self::prompt("Passphrase (pwbox): ")?;
        if self.confirm {
            let again = Self::prompt("Confirm passphrase (pwbox): ")?;
            if *again != *passphrase {
                return Err(PwboxError::with_kind(
                    ErrorCategory::Io,
                    ErrorKind::PassphraseUnavailable,
                    "passphrases do not match",
                ));
            }
        }
        Ok(passphrase)
    }
}

/// Wraps another reader and asks it at most once.
///
/// Errors are not cached: a failed upstream read is retried on the next
/// call. The cached passphrase is wiped when this reader is dropped.
pub struct CachingPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl CachingPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let passphrase = self.upstream.read_passphrase()?;
        self.cached = Some(passphrase.clone());
        Ok(passphrase)
    }
}
