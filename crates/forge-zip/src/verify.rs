//! Library-assisted confirmation
//!
//! The header-only checks in [`crate::crypto`] have a small but nonzero
//! false-positive rate (1/256 for ZipCrypto, 1/65536 for WinZip AES). Before
//! a password is reported to the caller as confirmed, it is replayed through
//! the `zip` crate's full decrypt-and-inflate path; a password that fails to
//! produce valid decompressed data here is rejected.
use std::io::{Read, Seek};

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("password rejected by archive library")]
    InvalidPassword,
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fully decrypts and decompresses `entry_name` from `archive` with
/// `password`, discarding the output. Returns `Ok(())` only if the whole
/// entry decompresses without a CRC or inflate error.
pub fn confirm<R: Read + Seek>(
    archive: R,
    entry_name: &str,
    password: &[u8],
) -> Result<(), ConfirmError> {
    let mut zip = zip::ZipArchive::new(archive)?;
    let mut file = match zip.by_name_decrypt(entry_name, password) {
        Ok(file) => file,
        Err(zip::result::ZipError::InvalidPassword) => {
            return Err(ConfirmError::InvalidPassword)
        }
        Err(e) => return Err(ConfirmError::Zip(e)),
    };
    let mut sink = std::io::sink();
    std::io::copy(&mut file, &mut sink)?;
    Ok(())
}
