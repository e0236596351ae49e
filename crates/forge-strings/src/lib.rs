//! Printable-string extraction, used to seed the cracker's candidate set
//! from the content of files in scope.
use std::io::Read;

use flate2::read::ZlibDecoder;

/// Scans `bytes` for maximal runs of printable ASCII at least `min_len`
/// bytes long, the same rule `strings(1)` uses by default.
pub fn extract_ascii_strings(bytes: &[u8], min_len: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut run_start = None;
    for (i, &b) in bytes.iter().enumerate() {
        let printable = (0x20..0x7f).contains(&b);
        if printable {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(start) = run_start.take() {
            push_run(&mut out, bytes, start, i, min_len);
        }
    }
    if let Some(start) = run_start {
        push_run(&mut out, bytes, start, bytes.len(), min_len);
    }
    out
}

fn push_run(out: &mut Vec<String>, bytes: &[u8], start: usize, end: usize, min_len: usize) {
    if end - start >= min_len {
        out.push(String::from_utf8_lossy(&bytes[start..end]).into_owned());
    }
}

/// Extracts strings from a file, dispatching to a format-aware path for
/// OOXML containers and PDFs. Anything else is scanned as a flat byte
/// buffer.
pub fn extract_from_file(bytes: &[u8], min_len: usize) -> Vec<String> {
    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
        if let Ok(mut archive) = zip::ZipArchive::new(std::io::Cursor::new(bytes)) {
            let mut strings = Vec::new();
            for i in 0..archive.len() {
                if let Ok(mut entry) = archive.by_index(i) {
                    let mut content = Vec::new();
                    if entry.read_to_end(&mut content).is_ok() {
                        strings.extend(extract_ascii_strings(&content, min_len));
                    }
                }
            }
            return strings;
        }
    }
    if bytes.starts_with(b"%PDF") {
        return extract_from_pdf(bytes, min_len);
    }
    extract_ascii_strings(bytes, min_len)
}

/// Scans a PDF for `FlateDecode` stream objects, inflates each one and
/// harvests strings from the decompressed content alongside the
/// cleartext dictionary text surrounding it, so compressed content
/// streams and object streams get the same treatment as OOXML's
/// DEFLATE-compressed parts.
fn extract_from_pdf(bytes: &[u8], min_len: usize) -> Vec<String> {
    let mut strings = Vec::new();
    let mut cleartext_start = 0;

    for stream_start in memchr::memmem::find_iter(bytes, b"stream") {
        if stream_start < cleartext_start {
            // Falls inside a stream body already consumed above.
            continue;
        }
        let Some(data_start) = stream_data_start(bytes, stream_start + b"stream".len()) else {
            continue;
        };
        let Some(end_offset) = memchr::memmem::find(&bytes[data_start..], b"endstream") else {
            continue;
        };
        let data_end = data_start + end_offset;

        let dict_start = cleartext_start.max(stream_start.saturating_sub(2048));
        if !bytes[dict_start..stream_start].windows(b"FlateDecode".len()).any(|w| w == b"FlateDecode") {
            continue;
        }

        strings.extend(extract_ascii_strings(&bytes[cleartext_start..stream_start], min_len));

        let raw = &bytes[data_start..data_end];
        let mut inflated = Vec::new();
        if ZlibDecoder::new(raw).read_to_end(&mut inflated).is_ok() {
            strings.extend(extract_ascii_strings(&inflated, min_len));
        } else {
            strings.extend(extract_ascii_strings(raw, min_len));
        }

        cleartext_start = data_end + b"endstream".len();
    }

    strings.extend(extract_ascii_strings(&bytes[cleartext_start..], min_len));
    strings
}

/// Skips the single EOL sequence (`\r\n`, `\n`, or a lone `\r`) that must
/// follow the `stream` keyword before the binary data begins.
fn stream_data_start(bytes: &[u8], after_keyword: usize) -> Option<usize> {
    match bytes.get(after_keyword..)? {
        [b'\r', b'\n', ..] => Some(after_keyword + 2),
        [b'\n', ..] => Some(after_keyword + 1),
        [b'\r', ..] => Some(after_keyword + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_runs_above_minimum_length() {
        let data = b"\x00\x01hello world\x00\x02hi\x00more text here\x00";
        let strings = extract_ascii_strings(data, 4);
        assert_eq!(strings, vec!["hello world", "more text here"]);
    }

    #[test]
    fn rejects_runs_shorter_than_minimum() {
        let data = b"\x00ab\x00cd\x00";
        assert!(extract_ascii_strings(data, 4).is_empty());
    }

    #[test]
    fn extracts_strings_from_flate_decode_streams() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write as _;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"BT /F1 12 Tf (hidden password) Tj ET").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n1 0 obj\n<< /Filter /FlateDecode /Length ");
        pdf.extend_from_slice(compressed.len().to_string().as_bytes());
        pdf.extend_from_slice(b" >>\nstream\n");
        pdf.extend_from_slice(&compressed);
        pdf.extend_from_slice(b"\nendstream\nendobj\n");

        let strings = extract_from_file(&pdf, 6);
        assert!(strings.iter().any(|s| s.contains("hidden password")));
    }
}
