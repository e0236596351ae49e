//! Converts a parsed [`crate::ole::crypto::OleCrypto`] into the shared
//! [`forge_ports::descriptor::FormatDescriptor`] contract.
use std::path::Path;

use forge_ports::descriptor::{FormatDescriptor, OfficeDesc};

use crate::error::OfficeError;
use crate::ole::crypto::{EncryptionType, OleCrypto};

pub fn to_format_descriptor(path: &Path, crypto: &OleCrypto) -> Result<FormatDescriptor, OfficeError> {
    let (cipher_algorithm, hash_algorithm, encryption_mode) = match &crypto.encryption_info.encryption_type {
        EncryptionType::Standard(se) => {
            if matches!(se.header.algorithm, crate::ole::crypto::EncryptionAlgo::Rc4) {
                return Err(OfficeError::Unsupported("RC4 is not allowed in Standard Encryption".into()));
            }
            (se.header.algorithm.to_string(), "SHA-1".to_string(), "ECB".to_string())
        }
        EncryptionType::Agile(ae) => (
            ae.key_data.cipher_algorithm.clone(),
            ae.key_data.hash_algorithm.clone(),
            ae.key_data.cipher_chaining.clone(),
        ),
    };

    Ok(FormatDescriptor::Office(OfficeDesc {
        archive_path: path.to_string_lossy().into_owned(),
        cipher_algorithm,
        hash_algorithm,
        encryption_mode,
    }))
}
