//! ZIP archive classification and password verification
//!
//! [`parser`] walks the central directory and classifies each entry's
//! encryption without decompressing anything. [`crypto`] implements the
//! cheap ZipCrypto/WinZip-AES password checks used to rule out most
//! candidates; [`verify::confirm`] does a full library-assisted decrypt to
//! rule out the checks' false positives before a password is reported as
//! confirmed.
pub mod crypto;
pub mod descriptor;
pub mod parser;
pub mod verify;

pub use parser::{AesStrength, EntryEncryption, ZipArchive, ZipEntry, ZipError};
