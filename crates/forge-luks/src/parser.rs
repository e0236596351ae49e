//! Parses LUKS1 and LUKS2 volume headers
use std::io::{Read, Seek, SeekFrom};

use crate::error::LuksError;

const SIGNATURE: [u8; 4] = *b"LUKS";
const LUKS1_ACTIVE_MAGIC: u32 = 0x00AC71F3;

#[derive(Debug, Clone)]
pub struct LuksVolume {
    pub version: u16,
    pub cipher: String,
    pub mode: String,
    pub hash: String,
    pub key_size_bits: u32,
    pub active_slots: Vec<u32>,
    pub guid: String,
}

pub fn parse<R: Read + Seek>(mut volume: R) -> Result<LuksVolume, LuksError> {
    let mut sig = [0u8; 4];
    volume.read_exact(&mut sig)?;
    if sig != SIGNATURE {
        return Err(LuksError::NotLuks);
    }
    volume.seek(SeekFrom::Start(6))?;
    let mut vbuf = [0u8; 2];
    volume.read_exact(&mut vbuf)?;
    let version = u16::from_be_bytes(vbuf);

    match version {
        1 => parse_v1(&mut volume),
        2 => parse_v2(&mut volume),
        other => Err(LuksError::UnsupportedVersion(other)),
    }
}

fn read_trimmed_ascii<R: Read + Seek>(r: &mut R, offset: u64, len: usize) -> Result<String, LuksError> {
    r.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn parse_v1<R: Read + Seek>(volume: &mut R) -> Result<LuksVolume, LuksError> {
    let cipher = read_trimmed_ascii(volume, 8, 32)?;
    let mode = read_trimmed_ascii(volume, 40, 32)?;
    let hash = read_trimmed_ascii(volume, 72, 32)?;

    volume.seek(SeekFrom::Start(108))?;
    let mut buf4 = [0u8; 4];
    volume.read_exact(&mut buf4)?;
    let key_size_bits = u32::from_be_bytes(buf4) * 8;

    let guid = read_trimmed_ascii(volume, 168, 40)?;

    let mut active_slots = Vec::new();
    for slot in 0..8u32 {
        let slot_offset = 208 + (slot as u64) * 48;
        volume.seek(SeekFrom::Start(slot_offset))?;
        volume.read_exact(&mut buf4)?;
        if u32::from_be_bytes(buf4) == LUKS1_ACTIVE_MAGIC {
            active_slots.push(slot);
        }
    }

    Ok(LuksVolume {
        version: 1,
        cipher,
        mode,
        hash,
        key_size_bits,
        active_slots,
        guid,
    })
}

fn parse_v2<R: Read + Seek>(volume: &mut R) -> Result<LuksVolume, LuksError> {
    volume.seek(SeekFrom::Start(8))?;
    let mut buf8 = [0u8; 8];
    volume.read_exact(&mut buf8)?;
    let json_area_size = u64::from_be_bytes(buf8);

    volume.seek(SeekFrom::Start(4096))?;
    let mut json_bytes = vec![0u8; json_area_size as usize];
    volume.read_exact(&mut json_bytes)?;
    let end = json_bytes.iter().position(|&b| b == 0).unwrap_or(json_bytes.len());
    let json: serde_json::Value = serde_json::from_slice(&json_bytes[..end])?;

    let keyslots = json.get("keyslots").and_then(|v| v.as_object());
    let mut active_slots = Vec::new();
    let mut key_size_bits = 0u32;
    if let Some(slots) = keyslots {
        let mut indices: Vec<&String> = slots.keys().collect();
        indices.sort();
        for key in indices {
            if let Ok(idx) = key.parse::<u32>() {
                active_slots.push(idx);
            }
            if key_size_bits == 0 {
                if let Some(size) = slots[key].get("key_size").and_then(|v| v.as_u64()) {
                    key_size_bits = size as u32 * 8;
                }
            }
        }
    }

    let segment_encryption = json
        .get("segments")
        .and_then(|v| v.as_object())
        .and_then(|segs| segs.values().next())
        .and_then(|seg| seg.get("encryption"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let (cipher, mode) = match segment_encryption.split_once('-') {
        Some((c, m)) => (c.to_string(), m.to_string()),
        None => (segment_encryption.to_string(), String::new()),
    };

    let hash = json
        .get("digests")
        .and_then(|v| v.as_object())
        .and_then(|digs| digs.values().next())
        .and_then(|d| d.get("hash"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let guid = json.get("config").and_then(|c| c.get("uuid")).and_then(|v| v.as_str()).unwrap_or("").to_string();

    Ok(LuksVolume {
        version: 2,
        cipher,
        mode,
        hash,
        key_size_bits,
        active_slots,
        guid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn v1_header() -> Vec<u8> {
        let mut h = vec![0u8; 208 + 8 * 48];
        h[0..4].copy_from_slice(b"LUKS");
        h[6..8].copy_from_slice(&1u16.to_be_bytes());
        h[8..8 + "aes-xts-plain64".len()].copy_from_slice(b"aes-xts-plain64");
        h[40..40 + "plain64".len()].copy_from_slice(b"plain64");
        h[72..72 + "sha256".len()].copy_from_slice(b"sha256");
        h[108..112].copy_from_slice(&32u32.to_be_bytes());
        h[168..168 + 36].copy_from_slice(b"12345678-1234-1234-1234-123456789012");
        h[208..212].copy_from_slice(&LUKS1_ACTIVE_MAGIC.to_be_bytes());
        h
    }

    #[test]
    fn parses_luks1_header() {
        let h = v1_header();
        let volume = parse(Cursor::new(h)).unwrap();
        assert_eq!(volume.version, 1);
        assert_eq!(volume.cipher, "aes-xts-plain64");
        assert_eq!(volume.mode, "plain64");
        assert_eq!(volume.hash, "sha256");
        assert_eq!(volume.key_size_bits, 256);
        assert_eq!(volume.active_slots, vec![0]);
    }

    #[test]
    fn rejects_non_luks_signature() {
        let h = vec![0u8; 16];
        assert!(matches!(parse(Cursor::new(h)), Err(LuksError::NotLuks)));
    }
}
