//! PDF standard-security-handler classification and password verification
//!
//! [`scan`] locates and extracts the `/Encrypt` dictionary from raw PDF
//! bytes without a full object model; [`descriptor`] turns that into a
//! [`forge_ports::FormatDescriptor`]; [`verify_v4`] and [`verify_v6`]
//! implement the revision-specific password checks.
pub mod descriptor;
pub mod error;
pub mod object;
pub mod scan;
pub mod verify_v4;
pub mod verify_v6;

use std::path::Path;

pub use error::PdfError;
use forge_ports::descriptor::FormatDescriptor;

/// Reads `path`, locates its encryption dictionary and produces the
/// format descriptor a verifier needs. Returns [`PdfError::NotEncrypted`]
/// for a plain document.
pub fn classify(path: &Path) -> Result<FormatDescriptor, PdfError> {
    let bytes = std::fs::read(path)?;
    let info = scan::scan(&bytes)?;
    descriptor::to_format_descriptor(&info)
}

/// Tests a candidate password against a PDF descriptor of either
/// revision family.
pub fn verify(desc: &FormatDescriptor, password: &[u8]) -> bool {
    match desc {
        FormatDescriptor::PdfV4(d) => verify_v4::verify(d, password),
        FormatDescriptor::PdfV6(d) => verify_v6::verify(d, password),
        _ => false,
    }
}
