//! The format descriptor: the small, self-contained set of cryptographic
//! parameters a verifier needs to test a password, extracted once during
//! parsing so no file handle needs to survive into the cracking phase.
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// One detected encrypted object, tagged by container format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FormatDescriptor {
    ZipCrypto(ZipCryptoDesc),
    ZipAes(ZipAesDesc),
    PdfV4(PdfDescV4),
    PdfV6(PdfDescV6),
    Office(OfficeDesc),
    Bitlocker(BitlockerInfo),
    Luks(LuksInfo),
}

/// A PKWARE traditional ("ZipCrypto") encrypted ZIP entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipCryptoDesc {
    pub archive_path: String,
    pub entry_path: String,
    pub local_header_offset: u64,
    pub general_purpose_flags_bits: u16,
    /// The byte the decrypted 12-byte header's last byte must match: the
    /// CRC-32 high byte, or the DOS-time high byte when a data descriptor
    /// follows the entry instead of a central-directory CRC.
    pub crc32_or_dos_time_high_byte: u8,
    /// The entry's 12-byte ZipCrypto encryption header, captured at parse
    /// time so the fast verification check never reopens the archive.
    #[serde(with = "base64_bytes")]
    pub encryption_header: Vec<u8>,
}

/// A WinZip AE-1/AE-2 (AES) encrypted ZIP entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipAesDesc {
    pub archive_path: String,
    pub entry_path: String,
    pub local_header_offset: u64,
    pub aes_strength: AesStrength,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub password_verifier: [u8; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AesStrength {
    Aes128,
    Aes192,
    Aes256,
}

impl AesStrength {
    pub fn bits(self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }
}

/// A standard-security-handler encrypted PDF, revisions 2-4
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDescV4 {
    pub revision: u8,
    pub key_length_bits: u32,
    pub o_key: [u8; 32],
    pub u_key: [u8; 32],
    pub permissions: [u8; 4],
    #[serde(with = "base64_bytes")]
    pub document_id: Vec<u8>,
    pub metadata_encrypted: bool,
}

/// A revision-6 (AES-256, "Algorithm 2.B") encrypted PDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDescV6 {
    #[serde(with = "BigArray")]
    pub o_key: [u8; 48],
    #[serde(with = "BigArray")]
    pub u_key: [u8; 48],
}

/// An OLE-wrapped encrypted OOXML document (MS-OFFCRYPTO)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeDesc {
    pub archive_path: String,
    pub cipher_algorithm: String,
    pub hash_algorithm: String,
    pub encryption_mode: String,
}

/// A BitLocker-protected volume's FVE metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitlockerInfo {
    pub encryption_method: String,
    pub creation_time_epoch: i64,
    pub description: String,
    pub key_protectors: Vec<KeyProtector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyProtector {
    pub guid: String,
    pub protection_type: String,
}

/// A LUKS1/LUKS2 volume header's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuksInfo {
    pub version: u16,
    pub cipher: String,
    pub mode: String,
    pub hash: String,
    pub key_size_bits: u32,
    pub active_slots: Vec<u32>,
    pub guid: String,
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zipcrypto_descriptor_round_trips_through_json() {
        let desc = FormatDescriptor::ZipCrypto(ZipCryptoDesc {
            archive_path: "case.zip".into(),
            entry_path: "secret.txt".into(),
            local_header_offset: 42,
            general_purpose_flags_bits: 0b1001,
            crc32_or_dos_time_high_byte: 0xAB,
            encryption_header: vec![0u8; 12],
        });
        let json = serde_json::to_string(&desc).unwrap();
        let back: FormatDescriptor = serde_json::from_str(&json).unwrap();
        match back {
            FormatDescriptor::ZipCrypto(d) => assert_eq!(d.local_header_offset, 42),
            _ => panic!("wrong variant"),
        }
    }
}
