//! Parses BitLocker (FVE) volume metadata from a raw volume image
use std::io::{Read, Seek, SeekFrom};

use forge_bytes::win32::{filetime_to_datetime, GUID};

use crate::error::BitlockerError;

/// Mixed-endianness BitLocker signature GUID, at volume offset 160
const SIGNATURE: [u8; 15] = [
    0x3B, 0xD6, 0x67, 0x49, 0x2E, 0x29, 0xD8, 0x4A, 0x83, 0x99, 0xF6, 0xA3, 0x39, 0xE3, 0xD0,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeKind {
    Bitlocker,
    BitlockerToGo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyProtectorKind {
    Clear,
    Tpm,
    StartupKey,
    TpmAndPin,
    RecoveryPassword,
    Password,
    Unknown(u16),
}

impl KeyProtectorKind {
    fn from_code(code: u16) -> Self {
        match code {
            0x0000 => Self::Clear,
            0x0100 => Self::Tpm,
            0x0200 => Self::StartupKey,
            0x0500 => Self::TpmAndPin,
            0x0800 => Self::RecoveryPassword,
            0x2000 => Self::Password,
            other => Self::Unknown(other),
        }
    }
}

impl std::fmt::Display for KeyProtectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Clear => "Clear",
            Self::Tpm => "TPM",
            Self::StartupKey => "Startup key",
            Self::TpmAndPin => "TPM+PIN",
            Self::RecoveryPassword => "Recovery password",
            Self::Password => "Password",
            Self::Unknown(_) => "Unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct KeyProtector {
    pub guid: GUID,
    pub kind: KeyProtectorKind,
}

#[derive(Debug, Clone)]
pub struct BitlockerVolume {
    pub kind: VolumeKind,
    pub encryption_method: String,
    pub creation_time_epoch: i64,
    pub description: String,
    pub key_protectors: Vec<KeyProtector>,
}

fn encryption_method_name(id: u32) -> &'static str {
    match id & 0xffff {
        0x8002 => "AES-CBC 128",
        0x8003 => "AES-CBC 256",
        0x8004 => "AES-XTS 128",
        _ => "Unknown",
    }
}

pub fn parse<R: Read + Seek>(mut volume: R) -> Result<BitlockerVolume, BitlockerError> {
    volume.seek(SeekFrom::Start(160))?;
    let mut sig = [0u8; 16];
    volume.read_exact(&mut sig)?;
    if sig[..15] != SIGNATURE {
        return Err(BitlockerError::NotBitlocker);
    }
    let kind = match sig[15] {
        0x00 => VolumeKind::Bitlocker,
        0x01 => VolumeKind::BitlockerToGo,
        other => return Err(BitlockerError::Malformed(format!("unrecognized BitLocker variant byte {other:#x}"))),
    };

    volume.seek(SeekFrom::Start(176))?;
    let mut buf8 = [0u8; 8];
    volume.read_exact(&mut buf8)?;
    let fve_metadata_offset = u64::from_le_bytes(buf8);

    volume.seek(SeekFrom::Start(fve_metadata_offset + 64))?;
    let mut buf4 = [0u8; 4];
    volume.read_exact(&mut buf4)?;
    let fve_metadata_size = u32::from_le_bytes(buf4);

    volume.seek(SeekFrom::Start(fve_metadata_offset + 64 + 36))?;
    volume.read_exact(&mut buf4)?;
    let encryption_method_id = u32::from_le_bytes(buf4);
    let encryption_method = encryption_method_name(encryption_method_id).to_string();

    volume.seek(SeekFrom::Start(fve_metadata_offset + 64 + 40))?;
    volume.read_exact(&mut buf8)?;
    let filetime = u64::from_le_bytes(buf8);
    let creation_time_epoch = ((filetime as i128 - 116_444_736_000_000_000i128) / 10_000_000) as i64;
    let _ = filetime_to_datetime(filetime);

    let entries_start = fve_metadata_offset + 48 + 64;
    volume.seek(SeekFrom::Start(entries_start))?;

    let mut key_protectors = Vec::new();
    let mut description = String::new();
    let mut consumed = 0u32;
    while consumed < fve_metadata_size {
        let entry_pos = entries_start + consumed as u64;
        volume.seek(SeekFrom::Start(entry_pos))?;
        let mut header = [0u8; 6];
        if volume.read_exact(&mut header).is_err() {
            break;
        }
        let size = u16::from_le_bytes([header[0], header[1]]);
        if size < 6 {
            break;
        }
        let entry_type = u16::from_le_bytes([header[2], header[3]]);
        let value_type = u16::from_le_bytes([header[4], header[5]]);

        if entry_type == 0x0002 && value_type == 0x0008 && size as u64 >= 28 {
            volume.seek(SeekFrom::Start(entry_pos + 6))?;
            let guid = GUID::from_le_stream(&mut volume).unwrap_or_else(|_| GUID::null());
            volume.seek(SeekFrom::Start(entry_pos + 26))?;
            let mut kind_buf = [0u8; 2];
            volume.read_exact(&mut kind_buf)?;
            let kind = KeyProtectorKind::from_code(u16::from_le_bytes(kind_buf));
            key_protectors.push(KeyProtector { guid, kind });
        } else if entry_type == 0x0007 && value_type == 0x0002 && size >= 6 {
            let payload_len = (size - 6) as usize;
            let mut payload = vec![0u8; payload_len];
            volume.seek(SeekFrom::Start(entry_pos + 6))?;
            volume.read_exact(&mut payload)?;
            let utf16: Vec<u16> = payload
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&c| c != 0)
                .collect();
            description.push_str(&String::from_utf16_lossy(&utf16));
        }

        consumed = consumed.saturating_add(size as u32);
    }

    Ok(BitlockerVolume {
        kind,
        encryption_method,
        creation_time_epoch,
        description,
        key_protectors,
    })
}
