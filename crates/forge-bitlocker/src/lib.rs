//! BitLocker volume metadata extraction
//!
//! [`parser`] walks the FVE metadata block of a raw volume image and
//! yields its encryption method, creation time and key protectors.
//! BitLocker has no candidate-password verifier of its own in scope here:
//! key protectors are either clear/TPM-backed (nothing to crack) or a
//! recovery password/numerical password, which the cracker treats as an
//! opaque candidate source rather than something this crate checks.
pub mod descriptor;
pub mod error;
pub mod parser;

use std::fs::File;
use std::path::Path;

pub use error::BitlockerError;
use forge_ports::descriptor::FormatDescriptor;

pub fn classify(path: &Path) -> Result<FormatDescriptor, BitlockerError> {
    let file = File::open(path)?;
    let volume = parser::parse(file)?;
    Ok(descriptor::to_format_descriptor(&volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_volume() -> Vec<u8> {
        let mut v = vec![0u8; 4096];
        v[160..175].copy_from_slice(&parser_signature());
        v[175] = 0x00;
        let fve_offset: u64 = 512;
        v[176..184].copy_from_slice(&fve_offset.to_le_bytes());

        let meta_size: u32 = 40;
        v[(fve_offset as usize + 64)..(fve_offset as usize + 68)].copy_from_slice(&meta_size.to_le_bytes());
        let method: u32 = 0x8003;
        v[(fve_offset as usize + 100)..(fve_offset as usize + 104)].copy_from_slice(&method.to_le_bytes());
        let filetime: u64 = 130_000_000_000_000_000;
        v[(fve_offset as usize + 104)..(fve_offset as usize + 112)].copy_from_slice(&filetime.to_le_bytes());

        let entries_start = fve_offset as usize + 48 + 64;
        let entry_size: u16 = 28;
        v[entries_start..entries_start + 2].copy_from_slice(&entry_size.to_le_bytes());
        v[entries_start + 2..entries_start + 4].copy_from_slice(&0x0002u16.to_le_bytes());
        v[entries_start + 4..entries_start + 6].copy_from_slice(&0x0008u16.to_le_bytes());
        v[entries_start + 26..entries_start + 28].copy_from_slice(&0x2000u16.to_le_bytes());
        v
    }

    fn parser_signature() -> [u8; 15] {
        [
            0x3B, 0xD6, 0x67, 0x49, 0x2E, 0x29, 0xD8, 0x4A, 0x83, 0x99, 0xF6, 0xA3, 0x39, 0xE3, 0xD0,
        ]
    }

    #[test]
    fn parses_encryption_method_and_key_protector() {
        let v = sample_volume();
        let volume = parser::parse(Cursor::new(v)).unwrap();
        assert_eq!(volume.encryption_method, "AES-CBC 256");
        assert_eq!(volume.key_protectors.len(), 1);
        assert_eq!(volume.key_protectors[0].kind.to_string(), "Password");
    }

    #[test]
    fn rejects_non_bitlocker_volume() {
        let v = vec![0u8; 4096];
        assert!(matches!(parser::parse(Cursor::new(v)), Err(BitlockerError::NotBitlocker)));
    }
}
