//! Conversion from a classified [`crate::ZipEntry`] to the cross-crate
//! [`forge_ports::FormatDescriptor`] the orchestrator consumes.
use crate::parser::{AesStrength, CentralHeader, EntryEncryption, ZipEntry};
use forge_ports::descriptor::{self, FormatDescriptor};

/// Converts this entry's encryption classification into a `FormatDescriptor`,
/// or `None` for entries that are unencrypted or use strong encryption
/// (out of crackable scope, per the parser's own classification).
pub fn to_format_descriptor(archive_path: &str, entry: &ZipEntry) -> Option<FormatDescriptor> {
    let entry_path = entry.header.name().into_owned();
    match &entry.encryption {
        EntryEncryption::None | EntryEncryption::Strong => None,
        EntryEncryption::ZipCrypto {
            encryption_header,
            verification_byte,
            ..
        } => Some(FormatDescriptor::ZipCrypto(descriptor::ZipCryptoDesc {
            archive_path: archive_path.to_string(),
            entry_path,
            local_header_offset: local_header_offset(&entry.header),
            general_purpose_flags_bits: entry.header.gp_flag,
            crc32_or_dos_time_high_byte: *verification_byte,
            encryption_header: encryption_header.to_vec(),
        })),
        EntryEncryption::Aes {
            strength,
            salt,
            password_verifier,
            ..
        } => Some(FormatDescriptor::ZipAes(descriptor::ZipAesDesc {
            archive_path: archive_path.to_string(),
            entry_path,
            local_header_offset: local_header_offset(&entry.header),
            aes_strength: convert_strength(*strength),
            salt: salt.clone(),
            password_verifier: *password_verifier,
        })),
    }
}

fn local_header_offset(header: &CentralHeader) -> u64 {
    header.local_header_offset.into()
}

fn convert_strength(s: AesStrength) -> descriptor::AesStrength {
    match s {
        AesStrength::Aes128 => descriptor::AesStrength::Aes128,
        AesStrength::Aes192 => descriptor::AesStrength::Aes192,
        AesStrength::Aes256 => descriptor::AesStrength::Aes256,
    }
}
