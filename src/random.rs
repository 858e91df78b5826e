//! Operating-system backed randomness for salts and nonces.

use rand::RngCore;
use rand::rngs::OsRng;

/// Fill `buf` from the operating system CSPRNG.
///
/// # Panics
///
/// Panics if the platform CSPRNG is unavailable. There is no fallback to a
/// weaker generator.
pub fn fill(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// Returns `len` fresh random bytes.
pub fn bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_length() {
        assert_eq!(bytes(0).len(), 0);
        assert_eq!(bytes(16).len(), 16);
        assert_eq!(bytes(12).len(), 12);
    }

    #[test]
    fn test_fresh_per_call() {
        // 2^-128 chance of a false failure.
        assert_ne!(bytes(16), bytes(16));
    }

    #[test]
    fn test_fill_overwrites_buffer() {
        let mut buf = [0u8; 64];
        fill(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
