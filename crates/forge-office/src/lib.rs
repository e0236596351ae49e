//! OLE-wrapped OOXML (MS-OFFCRYPTO) encryption classification and
//! password verification
//!
//! [`ole`] is the Compound File Binary reader needed to reach the
//! `EncryptionInfo` stream; its own [`ole::crypto`] submodule parses that
//! stream's *Standard* and *Agile* encryption variants and already knows
//! how to derive and test a password (`OleCrypto::get_key`), which is the
//! whole of the verification surface this crate needs.
pub mod descriptor;
pub mod error;
pub mod ole;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use error::OfficeError;
use forge_ports::descriptor::FormatDescriptor;

/// Opens `path` as an Ole compound file and classifies its encryption, if
/// any.
pub fn classify(path: &Path) -> Result<FormatDescriptor, OfficeError> {
    let file = File::open(path)?;
    let container = ole::Ole::new(BufReader::new(file))?;
    let crypto = container.get_decryptor().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OfficeError::NotEncrypted,
        _ => OfficeError::Io(e),
    })?;
    descriptor::to_format_descriptor(path, &crypto)
}

/// Tests a candidate password against a descriptor by reopening the
/// container and delegating to [`ole::crypto::OleCrypto::get_key`].
pub fn verify(archive_path: &str, password: &str) -> Result<bool, OfficeError> {
    let file = File::open(archive_path)?;
    let container = ole::Ole::new(BufReader::new(file))?;
    let crypto = container.get_decryptor()?;
    Ok(crypto.get_key(password).is_some())
}
