//! Locates and extracts a PDF's encryption dictionary and document ID
//! without a full object-stream/xref-aware reader.
use crate::error::PdfError;
use crate::object::{parse_dict, parse_object, PdfObject};

/// The fields of a `/Encrypt` dictionary needed to build a verifier
/// descriptor, plus the first element of the trailer's `/ID`.
pub struct EncryptionInfo {
    pub filter: String,
    pub v: i64,
    pub length_bits: u32,
    pub revision: u8,
    pub o: Vec<u8>,
    pub u: Vec<u8>,
    pub oe: Option<Vec<u8>>,
    pub ue: Option<Vec<u8>>,
    pub p: i32,
    pub encrypt_metadata: bool,
    pub document_id: Vec<u8>,
}

/// Runs the §4.2 extraction algorithm against a whole PDF byte buffer.
pub fn scan(bytes: &[u8]) -> Result<EncryptionInfo, PdfError> {
    let (num, gen) = find_last_encrypt_reference(bytes).ok_or(PdfError::NotEncrypted)?;
    let stripped = erase_encrypt_references(bytes);
    let dict_obj = find_indirect_dict(&stripped, num, gen)?;
    let dict = dict_obj.as_dict().ok_or_else(|| PdfError::Malformed("encrypt entry is not a dictionary".into()))?;

    let filter = dict
        .get("Filter")
        .and_then(PdfObject::as_name)
        .ok_or_else(|| PdfError::Malformed("/Encrypt dictionary missing /Filter".into()))?
        .to_string();
    if filter != "Standard" {
        return Err(PdfError::Unsupported(format!("non-Standard security handler {filter}")));
    }

    let v = dict.get("V").and_then(PdfObject::as_integer).unwrap_or(0);
    let length_bits = dict.get("Length").and_then(PdfObject::as_integer).unwrap_or(40) as u32;
    let revision = dict
        .get("R")
        .and_then(PdfObject::as_integer)
        .ok_or_else(|| PdfError::Malformed("/Encrypt dictionary missing /R".into()))? as u8;
    let o = dict
        .get("O")
        .and_then(PdfObject::as_bytes)
        .ok_or_else(|| PdfError::Malformed("/Encrypt dictionary missing /O".into()))?
        .to_vec();
    let u = dict
        .get("U")
        .and_then(PdfObject::as_bytes)
        .ok_or_else(|| PdfError::Malformed("/Encrypt dictionary missing /U".into()))?
        .to_vec();
    let oe = dict.get("OE").and_then(PdfObject::as_bytes).map(|b| b.to_vec());
    let ue = dict.get("UE").and_then(PdfObject::as_bytes).map(|b| b.to_vec());
    let p = dict.get("P").and_then(PdfObject::as_integer).unwrap_or(0) as i32;
    let encrypt_metadata = dict.get("EncryptMetadata").and_then(PdfObject::as_bool).unwrap_or(true);

    let document_id = find_trailer_id(&stripped)?;

    Ok(EncryptionInfo {
        filter,
        v,
        length_bits,
        revision,
        o,
        u,
        oe,
        ue,
        p,
        encrypt_metadata,
        document_id,
    })
}

/// Finds every `/Encrypt N G R` occurrence and returns the last one, per
/// the rule that repeated occurrences must agree and the last wins.
fn find_last_encrypt_reference(bytes: &[u8]) -> Option<(u32, u16)> {
    let mut found = None;
    for start in memchr::memmem::find_iter(bytes, b"/Encrypt") {
        if let Some((num, gen, _end)) = parse_ref_after(bytes, start + b"/Encrypt".len()) {
            found = Some((num, gen));
        }
    }
    found
}

fn parse_ref_after(bytes: &[u8], mut pos: usize) -> Option<(u32, u16, usize)> {
    pos = skip_ws(bytes, pos);
    let (num, next) = read_uint(bytes, pos)?;
    let next = skip_ws(bytes, next);
    let (gen, next) = read_uint(bytes, next)?;
    let next = skip_ws(bytes, next);
    if bytes.get(next) == Some(&b'R') {
        Some((num as u32, gen as u16, next + 1))
    } else {
        None
    }
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r' | b'\n') {
        pos += 1;
    }
    pos
}

fn read_uint(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
    let start = pos;
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if start == end {
        return None;
    }
    std::str::from_utf8(&bytes[start..end]).ok()?.parse().ok().map(|v| (v, end))
}

/// Produces a scratch copy with every `/Encrypt N G R` occurrence blanked
/// out with spaces, so a naive object scan never mistakes the trailer's
/// reference for something it must decrypt to read.
fn erase_encrypt_references(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for start in memchr::memmem::find_iter(bytes, b"/Encrypt") {
        if let Some((_, _, end)) = parse_ref_after(bytes, start + b"/Encrypt".len()) {
            for b in out.iter_mut().take(end).skip(start) {
                *b = b' ';
            }
        }
    }
    out
}

/// Locates `N G obj` in the stripped buffer and parses the object that
/// follows it.
fn find_indirect_dict(bytes: &[u8], num: u32, gen: u16) -> Result<PdfObject, PdfError> {
    let needle = format!("{num} {gen} obj");
    let start = memchr::memmem::find(bytes, needle.as_bytes())
        .ok_or_else(|| PdfError::Malformed(format!("indirect object {num} {gen} not found")))?;
    let body_start = start + needle.len();
    let (obj, _) = parse_object(bytes, body_start)?;
    Ok(obj)
}

/// Finds the last `trailer` keyword and reads `/ID`'s first element.
fn find_trailer_id(bytes: &[u8]) -> Result<Vec<u8>, PdfError> {
    let trailer_pos = memchr::memmem::rfind(bytes, b"trailer").ok_or_else(|| PdfError::Malformed("no trailer found".into()))?;
    let mut pos = trailer_pos + b"trailer".len();
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r' | b'\n') {
        pos += 1;
    }
    if bytes.get(pos) != Some(&b'<') || bytes.get(pos + 1) != Some(&b'<') {
        return Err(PdfError::Malformed("trailer is not a dictionary".into()));
    }
    let (obj, _) = parse_dict(bytes, pos)?;
    let dict = obj.as_dict().unwrap();
    let id_array = dict
        .get("ID")
        .and_then(PdfObject::as_array)
        .ok_or_else(|| PdfError::Malformed("trailer missing /ID".into()))?;
    id_array
        .first()
        .and_then(PdfObject::as_bytes)
        .map(|b| b.to_vec())
        .ok_or_else(|| PdfError::Malformed("trailer /ID is empty".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Vec::new();
        doc.extend_from_slice(b"%PDF-1.7\n");
        doc.extend_from_slice(b"5 0 obj\n<< /Filter /Standard /V 2 /R 3 /Length 128 /O <41414141> /U <42424242> /P -44 /EncryptMetadata true >>\nendobj\n");
        doc.extend_from_slice(b"trailer\n<< /Size 10 /Root 1 0 R /Encrypt 5 0 R /ID [<0102030405060708090a0b0c0d0e0f10> <0102030405060708090a0b0c0d0e0f10>] >>\n");
        doc.extend_from_slice(b"%%EOF");
        doc
    }

    #[test]
    fn extracts_encryption_dictionary_and_id() {
        let doc = sample_pdf();
        let info = scan(&doc).unwrap();
        assert_eq!(info.filter, "Standard");
        assert_eq!(info.revision, 3);
        assert_eq!(info.length_bits, 128);
        assert_eq!(info.p, -44);
        assert_eq!(info.document_id.len(), 16);
    }

    #[test]
    fn rejects_non_standard_filter() {
        let mut doc = Vec::new();
        doc.extend_from_slice(b"7 0 obj\n<< /Filter /Acme /V 1 /R 2 /O <41> /U <42> /P 0 >>\nendobj\n");
        doc.extend_from_slice(b"trailer\n<< /Encrypt 7 0 R /ID [<00> <00>] >>\n");
        assert!(matches!(scan(&doc), Err(PdfError::Unsupported(_))));
    }

    #[test]
    fn missing_encrypt_reference_is_not_encrypted() {
        let doc = b"%PDF-1.4\ntrailer\n<< /Size 1 >>\n".to_vec();
        assert!(matches!(scan(&doc), Err(PdfError::NotEncrypted)));
    }
}
