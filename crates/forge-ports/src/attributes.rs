//! `FORGE_*` artifact attribute names and value types
//!
//! These are the names/types the core reads and writes through
//! [`crate::ports::ArtifactStore`]; the host platform is free to store them
//! however it likes as long as it preserves the type tagged here.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AttributeValue {
    Int(i64),
    String(String),
    Bool(bool),
}

/// PDF encryption revision (2, 3, 4 or 6)
pub const FORGE_PDF_REVISION: &str = "FORGE_PDF_REVISION";
/// One of `ZipCrypto`, `AES-128`, `AES-192`, `AES-256`, `Strong Encryption`, `Unknown`
pub const FORGE_ZIP_FILE_ENCRYPTION_METHOD: &str = "FORGE_ZIP_FILE_ENCRYPTION_METHOD";
/// Comma-joined list of passwords already tried against this object
pub const FORGE_TRIED_PASSWORD: &str = "FORGE_TRIED_PASSWORD";
/// The password that successfully decrypted this object, once found
pub const FORGE_FOUND_PASSWORD: &str = "FORGE_FOUND_PASSWORD";
/// BitLocker encryption method, as a human-readable string (e.g. "AES-XTS 128-bit encryption")
pub const FORGE_BITLOCKER_ENCRYPTION_METHOD: &str = "FORGE_BITLOCKER_ENCRYPTION_METHOD";
/// LUKS cipher-mode pair, formatted `cipher-mode` (e.g. "aes-xts-plain64")
pub const FORGE_LUKS_CIPHER: &str = "FORGE_LUKS_CIPHER";
/// Office document encryption mode: `Standard`, `Agile`, `Legacy` or `Extensible`
pub const FORGE_OFFICE_ENCRYPTION_MODE: &str = "FORGE_OFFICE_ENCRYPTION_MODE";
