//! File encryption/decryption operations
//!
//! High-level operations that read a file, run it through the envelope and
//! armor layers, and write the result. Written files are readable by the
//! owner only (0o600) on Unix.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::armor;
use crate::envelope::Envelope;
use crate::error::{ErrorCategory, ErrorKind, PwboxError, Result};
use crate::passphrase::PassphraseReader;

/// Encrypt `input_path` into an armored container at `output_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let container = Envelope::default()
        .seal(&passphrase, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, armor::wrap(&container).as_bytes())?;

    info!(input = %input_path.display(), output = %output_path.display(), "encrypted file");
    Ok(())
}

/// Decrypt the armored container at `input_path` into `output_path`.
///
/// Nothing is written unless the container authenticates.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let armored = read_armored(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = open_armored(&armored, &passphrase)?;
    write_file_secure(output_path, &plaintext)?;

    info!(input = %input_path.display(), output = %output_path.display(), "decrypted file");
    Ok(())
}

/// Replace the encrypted file at `crypt_path` with the encryption of
/// `plain_path`, under the same passphrase.
///
/// The existing file is decrypted first so that a mistyped passphrase
/// cannot silently re-key the file. The replacement is atomic (tempfile,
/// fsync, rename): either the old or the new file exists, never a partial one.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let armored = read_armored(crypt_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    open_armored(&armored, &passphrase)?;

    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let container = Envelope::default()
        .seal(&passphrase, &new_plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;

    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::Builder::new()
        .prefix(".pwbox-update")
        .tempfile_in(crypt_dir)
        .map_err(|e| PwboxError::io("failed to create tempfile", e))?;

    temp_file
        .write_all(armor::wrap(&container).as_bytes())
        .map_err(|e| PwboxError::io("failed to write to tempfile", e))?;
    // Flush and fsync() so that a successful rename always points at a
    // complete file.
    temp_file
        .flush()
        .map_err(|e| PwboxError::io("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| PwboxError::io("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| PwboxError::io("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(crypt_path).map_err(|e| {
        PwboxError::io(
            format!("failed to rename to target file {}", crypt_path.display()),
            e.error,
        )
    })?;

    info!(input = %plain_path.display(), output = %crypt_path.display(), "updated file");
    Ok(())
}

fn read_armored(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        PwboxError::with_kind_and_source(
            ErrorCategory::Format,
            ErrorKind::ArmorInvalid,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

fn open_armored(armored: &str, passphrase: &[u8]) -> Result<Vec<u8>> {
    let container = armor::unwrap(armored).map_err(|e| e.with_context("failed to unarmor"))?;
    Envelope::default()
        .open(passphrase, &container)
        .map_err(|e| e.with_context("failed to decrypt"))
}

/// Write file with owner-only permissions on Unix.
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| PwboxError::io(format!("failed to open {}", path.display()), e))?;
    file.write_all(contents)
        .map_err(|e| PwboxError::io(format!("failed to write {}", path.display()), e))
}

fn read_error(path: &Path, err: io::Error) -> PwboxError {
    PwboxError::io(format!("failed to read from {}", path.display()), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::ConstantPassphraseReader;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn reader(passphrase: &[u8]) -> ConstantPassphraseReader {
        ConstantPassphraseReader::new(passphrase)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("plain.txt.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        let plaintext = b"Hello, pwbox!";
        fs::write(&plain_path, plaintext).unwrap();

        encrypt_file(&plain_path, &crypt_path, &mut reader(b"test password")).unwrap();
        let armored = fs::read_to_string(&crypt_path).unwrap();
        assert!(armored.starts_with("pwbox1:"));

        decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test password")).unwrap();
        assert_eq!(fs::read(&decrypted_path).unwrap(), plaintext);
    }

    #[test]
    fn test_update_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain1_path, b"Initial content").unwrap();
        encrypt_file(&plain1_path, &crypt_path, &mut reader(b"test password")).unwrap();

        fs::write(&plain2_path, b"Updated content").unwrap();
        update_file(&plain2_path, &crypt_path, &mut reader(b"test password")).unwrap();

        decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test password")).unwrap();
        assert_eq!(fs::read(&decrypted_path).unwrap(), b"Updated content");
    }

    #[test]
    fn test_update_with_wrong_passphrase_fails() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.pwbox");

        fs::write(&plain1_path, b"Initial").unwrap();
        encrypt_file(&plain1_path, &crypt_path, &mut reader(b"correct password")).unwrap();
        let before = fs::read(&crypt_path).unwrap();

        fs::write(&plain2_path, b"Updated").unwrap();
        let err = update_file(&plain2_path, &crypt_path, &mut reader(b"wrong password"))
            .expect_err("expected authentication failure");

        assert_eq!(err.category, ErrorCategory::Authentication);
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(fs::read(&crypt_path).unwrap(), before);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"test").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(b"test")).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test")).unwrap();

        for path in [&crypt_path, &decrypted_path] {
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }

        update_file(&plain_path, &crypt_path, &mut reader(b"test")).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_decrypt_wrong_passphrase_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.txt.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"secret").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(b"correct")).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"wrong")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Authentication);
        assert!(!decrypted_path.exists());
    }

    #[test]
    fn test_decrypt_garbage_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("garbage.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&crypt_path, b"definitely not armored").unwrap();
        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Format);
        assert_eq!(err.kind, Some(ErrorKind::ArmorInvalid));

        fs::write(&crypt_path, [0xffu8, 0xfe]).unwrap();
        let err = decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Format);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = encrypt_file(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("out.pwbox"),
            &mut reader(b"test"),
        )
        .unwrap_err();
        assert_eq!(err.category, ErrorCategory::Io);
        assert_eq!(err.kind, Some(ErrorKind::Io));
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("empty.txt");
        let crypt_path = temp_dir.path().join("empty.txt.pwbox");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, b"").unwrap();
        encrypt_file(&plain_path, &crypt_path, &mut reader(b"test")).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, &mut reader(b"test")).unwrap();

        assert_eq!(fs::read(&decrypted_path).unwrap(), b"");
    }
}
