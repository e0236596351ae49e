//! Converts a scanned [`crate::scan::EncryptionInfo`] into the shared
//! [`forge_ports::descriptor::FormatDescriptor`] contract.
use forge_ports::descriptor::{FormatDescriptor, PdfDescV4, PdfDescV6};

use crate::error::PdfError;
use crate::scan::EncryptionInfo;

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

pub fn to_format_descriptor(info: &EncryptionInfo) -> Result<FormatDescriptor, PdfError> {
    match info.revision {
        2 | 3 | 4 => Ok(FormatDescriptor::PdfV4(PdfDescV4 {
            revision: info.revision,
            key_length_bits: if info.v == 1 { 40 } else { info.length_bits },
            o_key: fixed::<32>(&info.o),
            u_key: fixed::<32>(&info.u),
            permissions: info.p.to_le_bytes(),
            document_id: info.document_id.clone(),
            metadata_encrypted: info.encrypt_metadata,
        })),
        6 => Ok(FormatDescriptor::PdfV6(PdfDescV6 {
            o_key: fixed::<48>(&info.o),
            u_key: fixed::<48>(&info.u),
        })),
        other => Err(PdfError::Unsupported(format!("revision {other}"))),
    }
}
