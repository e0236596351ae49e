//! Dispatches a candidate password to the format-specific verifier for
//! a [`FormatDescriptor`].
use forge_ports::descriptor::FormatDescriptor;

use crate::error::CrackError;

/// Tests `password` against `desc`. Returns `Err(CrackError::UnsupportedFormat)`
/// for formats with no per-candidate verifier (BitLocker, LUKS): their key
/// derivation is too expensive to run per-candidate without a real unlock
/// attempt, which is out of scope here.
pub fn verify(desc: &FormatDescriptor, password: &[u8]) -> Result<bool, CrackError> {
    match desc {
        FormatDescriptor::ZipCrypto(d) => Ok(forge_zip::crypto::verify_zipcrypto_descriptor(password, d)),
        FormatDescriptor::ZipAes(d) => Ok(forge_zip::crypto::verify_zip_aes_descriptor(password, d)),
        FormatDescriptor::PdfV4(_) | FormatDescriptor::PdfV6(_) => Ok(forge_pdf::verify(desc, password)),
        FormatDescriptor::Office(d) => {
            let Ok(text) = std::str::from_utf8(password) else {
                return Ok(false);
            };
            Ok(forge_office::verify(&d.archive_path, text).unwrap_or(false))
        }
        FormatDescriptor::Bitlocker(_) | FormatDescriptor::Luks(_) => Err(CrackError::UnsupportedFormat),
    }
}

/// For ZIP formats, a positive fast-path check still carries a small
/// false-positive rate. This replays the candidate through a full
/// library-assisted decrypt to rule those out before a password is
/// reported as confirmed; all other formats' fast checks are exact.
///
/// Only an explicit `InvalidPassword` verdict from the archive library
/// rejects the candidate. Any other failure (the archive can't be
/// reopened, it's malformed, the entry can't be read) is swallowed and
/// treated as accepted, leaving the semantic check to the caller.
pub fn confirm(desc: &FormatDescriptor, password: &[u8]) -> bool {
    match desc {
        FormatDescriptor::ZipCrypto(d) => zip_confirm(&d.archive_path, &d.entry_path, password),
        FormatDescriptor::ZipAes(d) => zip_confirm(&d.archive_path, &d.entry_path, password),
        _ => true,
    }
}

fn zip_confirm(archive_path: &str, entry_path: &str, password: &[u8]) -> bool {
    let Ok(file) = std::fs::File::open(archive_path) else {
        return true;
    };
    match forge_zip::verify::confirm(std::io::BufReader::new(file), entry_path, password) {
        Ok(()) => true,
        Err(forge_zip::verify::ConfirmError::InvalidPassword) => false,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_ports::descriptor::BitlockerInfo;

    #[test]
    fn bitlocker_has_no_candidate_verifier() {
        let desc = FormatDescriptor::Bitlocker(BitlockerInfo {
            encryption_method: "AES-128".into(),
            creation_time_epoch: 0,
            description: String::new(),
            key_protectors: Vec::new(),
        });
        assert!(matches!(verify(&desc, b"anything"), Err(CrackError::UnsupportedFormat)));
    }
}
