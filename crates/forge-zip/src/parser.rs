//! ZIP archive parser
//!
//! Scans a ZIP archive without decompressing any entry, classifying the
//! encryption scheme (if any) used by each entry. Zip64 and split archives
//! are explicitly unsupported: the parser surfaces them as
//! [`ZipError::Unsupported`] rather than attempting to handle the Zip64
//! extensions.
use forge_bytes::dostime::dos_time_decode;
use forge_bytes::io::{rdu16le, rdu32le};
use std::io::{Read, Seek};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";
const CENTRAL_HEADER_SIGNATURE: &[u8] = b"PK\x01\x02";
const LOCAL_HEADER_SIGNATURE: &[u8] = b"PK\x03\x04";
const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

const GP_IS_ENCRYPTED: u16 = 1 << 0;
const GP_HAS_DATA_DESCRIPTOR: u16 = 1 << 3;
const GP_IS_STRONG_ENCRYPTED: u16 = 1 << 6;

/// Errors raised while parsing a ZIP archive
#[derive(Debug, thiserror::Error)]
pub enum ZipError {
    #[error("not a valid zip file: end of central directory not found")]
    MalformedArchive,
    #[error("malformed zip structure: {0}")]
    Malformed(String),
    #[error("unsupported zip feature: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// End of central directory record
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub cd_first_disk: u16,
    pub entries_this_disk: u16,
    pub entries_total: u16,
    pub cd_size: u32,
    pub cd_offset_on_first_disk: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    fn new<R: Read>(mut r: R) -> Result<Self, ZipError> {
        let mut signature = [0u8; 4];
        r.read_exact(&mut signature)?;
        if signature != EOCD_SIGNATURE {
            return Err(ZipError::Malformed("bad EOCD signature".into()));
        }
        let ret = Self {
            disk_number: rdu16le(&mut r)?,
            cd_first_disk: rdu16le(&mut r)?,
            entries_this_disk: rdu16le(&mut r)?,
            entries_total: rdu16le(&mut r)?,
            cd_size: rdu32le(&mut r)?,
            cd_offset_on_first_disk: rdu32le(&mut r)?,
            comment: Vec::new(),
        };
        let comment_len = rdu16le(&mut r)?;
        let mut comment = vec![0u8; comment_len.into()];
        r.read_exact(&mut comment)?;
        Ok(Self { comment, ..ret })
    }

    fn check_supported(&self) -> Result<(), ZipError> {
        if self.disk_number != self.cd_first_disk || self.entries_this_disk != self.entries_total
        {
            return Err(ZipError::Unsupported("split archive".into()));
        }
        if self.entries_total == 0xffff
            || self.cd_size == 0xffff_ffff
            || self.cd_offset_on_first_disk == 0xffff_ffff
        {
            return Err(ZipError::Unsupported("zip64 archive".into()));
        }
        Ok(())
    }
}

/// Classification of an entry's encryption
#[derive(Debug, Clone, PartialEq)]
pub enum EntryEncryption {
    None,
    ZipCrypto {
        /// the 12-byte encryption header prepended to the entry's compressed data
        encryption_header: [u8; 12],
        /// the plaintext byte the decrypted header's last byte must match: the CRC
        /// high byte, or the DOS-time high byte when a trailing data descriptor is
        /// present (APPNOTE 6.1.6)
        verification_byte: u8,
        has_data_descriptor: bool,
    },
    Aes {
        strength: AesStrength,
        salt: Vec<u8>,
        password_verifier: [u8; 2],
        actual_compression_method: u16,
    },
    /// PKWARE "strong encryption" (bit 6 of the general purpose flags). Out of
    /// crackable scope: metadata only.
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesStrength {
    Aes128,
    Aes192,
    Aes256,
}

impl AesStrength {
    pub fn key_bits(self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }

    pub fn salt_len(self) -> usize {
        self.key_bits() as usize / 16
    }

    fn from_strength_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Aes128),
            2 => Some(Self::Aes192),
            3 => Some(Self::Aes256),
            _ => None,
        }
    }
}

impl From<forge_ports::descriptor::AesStrength> for AesStrength {
    fn from(s: forge_ports::descriptor::AesStrength) -> Self {
        match s {
            forge_ports::descriptor::AesStrength::Aes128 => Self::Aes128,
            forge_ports::descriptor::AesStrength::Aes192 => Self::Aes192,
            forge_ports::descriptor::AesStrength::Aes256 => Self::Aes256,
        }
    }
}

/// Extra field TLV block, as attached to central/local headers
#[derive(Debug, Clone)]
pub struct ExtraFields(Vec<u8>);

impl ExtraFields {
    fn new<R: Read>(r: &mut R, len: usize) -> Result<Self, std::io::Error> {
        let mut data = vec![0u8; len];
        r.read_exact(&mut data)?;
        Ok(Self(data))
    }

    /// Retrieves the raw field data for the given extra-field id, if present
    pub fn field_data(&self, field_id: u16) -> Option<&[u8]> {
        let mut extradata: &[u8] = self.0.as_ref();
        loop {
            let id = rdu16le(&mut extradata).ok()?;
            let len: usize = rdu16le(&mut extradata).ok()?.into();
            if id == field_id {
                return extradata.get(..len);
            }
            extradata = extradata.get(len..)?;
        }
    }
}

/// A central directory record (APPNOTE 4.3.12), trimmed to the fields the
/// cracker and format descriptor need.
#[derive(Debug, Clone)]
pub struct CentralHeader {
    pub ver_made_by: u16,
    pub ver_to_extract: u16,
    pub gp_flag: u16,
    pub compression_method: u16,
    pub mtime: Option<time::PrimitiveDateTime>,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: Vec<u8>,
    pub extras: ExtraFields,
    pub local_header_offset: u32,
}

impl CentralHeader {
    fn new<R: Read>(r: &mut R) -> Result<Self, ZipError> {
        let mut signature = [0u8; 4];
        r.read_exact(&mut signature)?;
        if signature != CENTRAL_HEADER_SIGNATURE {
            return Err(ZipError::Malformed(
                "central directory record missing signature".into(),
            ));
        }
        let ver_made_by = rdu16le(r)?;
        let ver_to_extract = rdu16le(r)?;
        let gp_flag = rdu16le(r)?;
        let compression_method = rdu16le(r)?;
        let dostime = rdu16le(r)?;
        let dosdate = rdu16le(r)?;
        let mtime = dos_time_decode(dosdate, dostime);
        let crc32 = rdu32le(r)?;
        let compressed_size = rdu32le(r)?;
        let uncompressed_size = rdu32le(r)?;
        let fname_len = rdu16le(r)?;
        let extra_len = rdu16le(r)?;
        let comment_len = rdu16le(r)?;
        let _disk_number = rdu16le(r)?;
        let _internal_attributes = rdu16le(r)?;
        let _external_attributes = rdu32le(r)?;
        let local_header_offset = rdu32le(r)?;
        if compressed_size == 0xffff_ffff
            || uncompressed_size == 0xffff_ffff
            || local_header_offset == 0xffff_ffff
        {
            return Err(ZipError::Unsupported("zip64 entry".into()));
        }
        let mut file_name = vec![0u8; fname_len.into()];
        r.read_exact(&mut file_name)?;
        let extras = ExtraFields::new(r, extra_len.into())?;
        let mut comment = vec![0u8; comment_len.into()];
        r.read_exact(&mut comment)?;
        Ok(Self {
            ver_made_by,
            ver_to_extract,
            gp_flag,
            compression_method,
            mtime,
            crc32,
            compressed_size,
            uncompressed_size,
            file_name,
            extras,
            local_header_offset,
        })
    }

    /// A lossy UTF-8 representation of the entry path
    pub fn name(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.file_name)
    }

    /// Names ending in `/` denote directories
    pub fn is_directory(&self) -> bool {
        self.file_name.last() == Some(&b'/')
    }
}

/// A fully classified ZIP entry
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub header: CentralHeader,
    pub encryption: EntryEncryption,
}

impl ZipEntry {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self.encryption, EntryEncryption::None)
    }
}

/// A parsed ZIP archive: the end-of-central-directory record plus every
/// classified entry.
#[derive(Debug)]
pub struct ZipArchive {
    pub eocd: EndOfCentralDirectory,
    pub entries: Vec<ZipEntry>,
}

impl ZipArchive {
    /// Locates the EOCD, walks the central directory and classifies each
    /// entry's encryption. See `ZipArchive::locate_eocd` for the backward
    /// scan algorithm.
    pub fn parse<R: Read + Seek>(mut r: R) -> Result<Self, ZipError> {
        let fsize = r.seek(std::io::SeekFrom::End(0))?;
        let eocd_offset = Self::locate_eocd(&mut r, fsize)?;
        r.seek(std::io::SeekFrom::Start(eocd_offset))?;
        let eocd = EndOfCentralDirectory::new(&mut r)?;
        eocd.check_supported()?;

        r.seek(std::io::SeekFrom::Start(eocd.cd_offset_on_first_disk.into()))?;
        let mut entries = Vec::with_capacity(eocd.entries_total.into());
        for _ in 0..eocd.entries_total {
            let header = CentralHeader::new(&mut r)?;
            let encryption = classify_entry(&mut r, &header)?;
            entries.push(ZipEntry { header, encryption });
        }
        Ok(Self { eocd, entries })
    }

    /// Scans backward from `file_size - 22` for the EOCD signature `PK\x05\x06`.
    /// 22 bytes is the minimum fixed-size EOCD length; when an archive comment
    /// is present the signature lies further back, so the scan walks byte by
    /// byte toward offset 0 until it is found or the scan is exhausted.
    fn locate_eocd<R: Read + Seek>(r: &mut R, file_size: u64) -> Result<u64, ZipError> {
        const MIN_EOCD_LEN: u64 = 22;
        const MAX_COMMENT_LEN: u64 = 0xffff;
        if file_size < MIN_EOCD_LEN {
            return Err(ZipError::MalformedArchive);
        }
        let scan_start = file_size.saturating_sub(MIN_EOCD_LEN + MAX_COMMENT_LEN);
        let window_len = (file_size - scan_start) as usize;
        r.seek(std::io::SeekFrom::Start(scan_start))?;
        let mut buf = vec![0u8; window_len];
        r.read_exact(&mut buf)?;
        for found_at in memchr::memmem::rfind_iter(&buf, EOCD_SIGNATURE) {
            let found_off = scan_start + found_at as u64;
            debug!("candidate EOCD at {found_off:#x}");
            return Ok(found_off);
        }
        Err(ZipError::MalformedArchive)
    }
}

fn classify_entry<R: Read + Seek>(
    r: &mut R,
    header: &CentralHeader,
) -> Result<EntryEncryption, ZipError> {
    if header.gp_flag & GP_IS_ENCRYPTED == 0 {
        return Ok(EntryEncryption::None);
    }
    if header.gp_flag & GP_IS_STRONG_ENCRYPTED != 0 {
        return Ok(EntryEncryption::Strong);
    }
    if header.compression_method == 99 {
        let local_extras = read_local_extras(r, header)?;
        let Some(field) = local_extras.field_data(0x9901) else {
            return Err(ZipError::Malformed(
                "WinZip AES entry without 0x9901 extra field".into(),
            ));
        };
        if field.len() < 7 {
            return Err(ZipError::Malformed("truncated AES extra field".into()));
        }
        let vendor_version = u16::from_le_bytes([field[0], field[1]]);
        let vendor_id = u16::from_le_bytes([field[2], field[3]]);
        if !(1..=2).contains(&vendor_version) || vendor_id != 0x4541 {
            return Err(ZipError::Malformed("invalid AES extra field".into()));
        }
        let strength = AesStrength::from_strength_byte(field[4])
            .ok_or_else(|| ZipError::Malformed("invalid AES strength".into()))?;
        let actual_compression_method = u16::from_le_bytes([field[5], field[6]]);
        let salt_len = strength.salt_len();
        let trailer_len = salt_len + 2 + 10; // salt + password-verifier + 10-byte auth code
        let lh_offset = u64::from(header.local_header_offset);
        let data_offset = local_header_data_offset(r, lh_offset)?;
        r.seek(std::io::SeekFrom::Start(data_offset))?;
        let mut salt = vec![0u8; salt_len];
        r.read_exact(&mut salt)?;
        let mut password_verifier = [0u8; 2];
        r.read_exact(&mut password_verifier)?;
        let csize = usize::try_from(header.compressed_size)
            .map_err(|_| ZipError::Malformed("compressed size overflow".into()))?;
        if csize < trailer_len {
            return Err(ZipError::Malformed("AES entry too small".into()));
        }
        Ok(EntryEncryption::Aes {
            strength,
            salt,
            password_verifier,
            actual_compression_method,
        })
    } else {
        let lh_offset = u64::from(header.local_header_offset);
        let (gp_flag, crc32, dostime) = read_local_header_for_pwdcheck(r, lh_offset)?;
        let has_data_descriptor = gp_flag & GP_HAS_DATA_DESCRIPTOR != 0;
        let verification_byte = if has_data_descriptor {
            (dostime >> 8) as u8
        } else {
            (crc32 >> 24) as u8
        };
        let data_offset = local_header_data_offset(r, lh_offset)?;
        r.seek(std::io::SeekFrom::Start(data_offset))?;
        let mut encryption_header = [0u8; 12];
        r.read_exact(&mut encryption_header)?;
        Ok(EntryEncryption::ZipCrypto {
            encryption_header,
            verification_byte,
            has_data_descriptor,
        })
    }
}

/// Seeks to a local header and reads just enough to get its extra fields
fn read_local_extras<R: Read + Seek>(
    r: &mut R,
    header: &CentralHeader,
) -> Result<ExtraFields, ZipError> {
    r.seek(std::io::SeekFrom::Start(header.local_header_offset.into()))?;
    let mut signature = [0u8; 4];
    r.read_exact(&mut signature)?;
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(ZipError::Malformed(
            "local header missing signature".into(),
        ));
    }
    let _ver_to_extract = rdu16le(r)?;
    let _gp_flag = rdu16le(r)?;
    let _compression_method = rdu16le(r)?;
    let _dostime = rdu16le(r)?;
    let _dosdate = rdu16le(r)?;
    let _crc32 = rdu32le(r)?;
    let _compressed_size = rdu32le(r)?;
    let _uncompressed_size = rdu32le(r)?;
    let fname_len = rdu16le(r)?;
    let extra_len = rdu16le(r)?;
    r.seek(std::io::SeekFrom::Current(fname_len.into()))?;
    ExtraFields::new(r, extra_len.into()).map_err(ZipError::from)
}

/// Returns the offset of the local header's compressed data, right past its
/// (possibly different from the central header's) file name and extra field
fn local_header_data_offset<R: Read + Seek>(
    r: &mut R,
    local_header_offset: u64,
) -> Result<u64, ZipError> {
    r.seek(std::io::SeekFrom::Start(local_header_offset))?;
    let mut signature = [0u8; 4];
    r.read_exact(&mut signature)?;
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(ZipError::Malformed(
            "local header missing signature".into(),
        ));
    }
    r.seek(std::io::SeekFrom::Current(22))?; // past ver/flags/method/time/date/crc/sizes
    let fname_len = rdu16le(r)?;
    let extra_len = rdu16le(r)?;
    r.seek(std::io::SeekFrom::Current(
        i64::from(fname_len) + i64::from(extra_len),
    ))?;
    r.stream_position().map_err(ZipError::from)
}

/// Local-header-offset-relative field reads needed for the ZipCrypto verification
/// byte: `(gp_flag, crc32, dostime)`
fn read_local_header_for_pwdcheck<R: Read + Seek>(
    r: &mut R,
    local_header_offset: u64,
) -> Result<(u16, u32, u16), ZipError> {
    r.seek(std::io::SeekFrom::Start(local_header_offset))?;
    let mut signature = [0u8; 4];
    r.read_exact(&mut signature)?;
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(ZipError::Malformed(
            "local header missing signature".into(),
        ));
    }
    let _ver_to_extract = rdu16le(r)?;
    let gp_flag = rdu16le(r)?;
    let _compression_method = rdu16le(r)?;
    let dostime = rdu16le(r)?;
    let _dosdate = rdu16le(r)?;
    let mut crc32 = rdu32le(r)?;
    let mut compressed_size: u64 = rdu32le(r)?.into();
    let _uncompressed_size = rdu32le(r)?;
    let fname_len = rdu16le(r)?;
    let extra_len = rdu16le(r)?;
    r.seek(std::io::SeekFrom::Current(
        i64::from(fname_len) + i64::from(extra_len),
    ))?;
    if gp_flag & GP_HAS_DATA_DESCRIPTOR != 0 {
        r.seek(std::io::SeekFrom::Current(
            i64::try_from(compressed_size)
                .map_err(|_| ZipError::Malformed("compressed size overflow".into()))?,
        ))?;
        let maybe_signature = rdu32le(r)?;
        crc32 = if maybe_signature == DATA_DESCRIPTOR_SIGNATURE {
            rdu32le(r)?
        } else {
            maybe_signature
        };
        compressed_size = rdu32le(r)?.into();
        let _ = compressed_size;
    }
    Ok((gp_flag, crc32, dostime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_zip(entries: &[(&[u8], u16, &[u8])]) -> Vec<u8> {
        // entries: (name, gp_flag, extra)
        let mut out = Vec::new();
        let mut central = Vec::new();
        for (name, gp_flag, extra) in entries {
            let local_offset = out.len() as u32;
            out.extend_from_slice(LOCAL_HEADER_SIGNATURE);
            out.extend_from_slice(&0u16.to_le_bytes()); // ver_to_extract
            out.extend_from_slice(&gp_flag.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // compression method
            out.extend_from_slice(&0u16.to_le_bytes()); // dostime
            out.extend_from_slice(&0u16.to_le_bytes()); // dosdate
            out.extend_from_slice(&0u32.to_le_bytes()); // crc32
            out.extend_from_slice(&0u32.to_le_bytes()); // compressed size
            out.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(name);
            out.extend_from_slice(extra);

            central.extend_from_slice(CENTRAL_HEADER_SIGNATURE);
            central.extend_from_slice(&0u16.to_le_bytes()); // ver_made_by
            central.extend_from_slice(&0u16.to_le_bytes()); // ver_to_extract
            central.extend_from_slice(&gp_flag.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // compression method
            central.extend_from_slice(&0u16.to_le_bytes()); // dostime
            central.extend_from_slice(&0u16.to_le_bytes()); // dosdate
            central.extend_from_slice(&0u32.to_le_bytes()); // crc32
            central.extend_from_slice(&0u32.to_le_bytes()); // compressed size
            central.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // extra len (central)
            central.extend_from_slice(&0u16.to_le_bytes()); // comment len
            central.extend_from_slice(&0u16.to_le_bytes()); // disk number
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            central.extend_from_slice(&local_offset.to_le_bytes());
            central.extend_from_slice(name);
        }
        let cd_offset = out.len() as u32;
        let cd_size = central.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(EOCD_SIGNATURE);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment len
        out
    }

    #[test]
    fn parses_unencrypted_entry() {
        let data = minimal_zip(&[(b"hello.txt", 0, &[])]);
        let archive = ZipArchive::parse(Cursor::new(data)).unwrap();
        assert_eq!(archive.entries.len(), 1);
        assert!(!archive.entries[0].is_encrypted());
        assert_eq!(archive.entries[0].header.name(), "hello.txt");
    }

    #[test]
    fn classifies_zipcrypto_entry() {
        let data = minimal_zip(&[(b"secret.txt", GP_IS_ENCRYPTED, &[])]);
        let archive = ZipArchive::parse(Cursor::new(data)).unwrap();
        assert!(matches!(
            archive.entries[0].encryption,
            EntryEncryption::ZipCrypto { .. }
        ));
    }

    #[test]
    fn rejects_truncated_archive() {
        let err = ZipArchive::parse(Cursor::new(vec![0u8; 10])).unwrap_err();
        assert!(matches!(err, ZipError::MalformedArchive));
    }

    #[test]
    fn rejects_zip64_sentinel() {
        let mut data = minimal_zip(&[(b"big.bin", 0, &[])]);
        let eocd_pos = data.len() - 22;
        data[eocd_pos + 10..eocd_pos + 12].copy_from_slice(&0xffffu16.to_le_bytes());
        let err = ZipArchive::parse(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, ZipError::Unsupported(_)));
    }
}
