//! Text armor for containers
//!
//! Wraps binary containers as `pwbox1:{base64url-no-padding}` so they can be
//! stored as strings. The armored form is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell
//!
//! The armor version is independent of the container version carried inside.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::{ErrorCategory, ErrorKind, PwboxError, Result};

/// Prefix shared by all armor versions
const MAGIC_PREFIX: &str = "pwbox";

/// Version 1 armor marker
const V1_MAGIC: &str = "pwbox1:";

/// Armor bytes as a `pwbox1:` string.
pub fn wrap(body: &[u8]) -> String {
    let mut armored = String::with_capacity(V1_MAGIC.len() + body.len().div_ceil(3) * 4);
    armored.push_str(V1_MAGIC);
    URL_SAFE_NO_PAD.encode_string(body, &mut armored);
    armored
}

/// Reverse [`wrap`].
///
/// Surrounding ASCII whitespace is ignored, so a trailing newline added by
/// an editor does not break decoding.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let armored = armored.trim_ascii();

    // Anything shorter than the marker is truncated unless it already names
    // another armor version (e.g. "pwbox2").
    if armored.len() < V1_MAGIC.len()
        && (V1_MAGIC.starts_with(armored) || !armored.starts_with(MAGIC_PREFIX))
    {
        return Err(PwboxError::format(
            ErrorKind::ArmorInvalid,
            "input size smaller than armor marker; likely truncated",
        ));
    }

    match armored.strip_prefix(V1_MAGIC) {
        Some(encoded) => URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            PwboxError::with_kind_and_source(
                ErrorCategory::Format,
                ErrorKind::ArmorDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        }),
        None if armored.starts_with(MAGIC_PREFIX) => Err(PwboxError::format(
            ErrorKind::ArmorFromFuture,
            "input claims to be pwbox data, but not an armor version we support",
        )),
        None => Err(PwboxError::format(
            ErrorKind::ArmorInvalid,
            "input unrecognized as pwbox data",
        )),
    }
}
